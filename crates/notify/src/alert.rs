//! Alert payload shared by all channels.

/// A labelled reference link attached to an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl Link {
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// A short alert: a head line identifying the subject, a body describing
/// the problem, and links for follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub head: String,
    pub body: String,
    pub links: Vec<Link>,
}

impl Alert {
    #[must_use]
    pub fn new(head: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            body: body.into(),
            links: Vec::new(),
        }
    }

    /// Attach a reference link.
    #[must_use]
    pub fn with_link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.links.push(Link::new(label, url));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_keep_insertion_order() {
        let alert = Alert::new("1.2.3.4 | main", "can't connect.")
            .with_link("DASHBOARD", "https://a")
            .with_link("EXPLORER", "https://b");

        assert_eq!(alert.links.len(), 2);
        assert_eq!(alert.links[0].label, "DASHBOARD");
        assert_eq!(alert.links[1].url, "https://b");
    }
}
