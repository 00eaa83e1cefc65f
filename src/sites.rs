//! Tracked-site table and URL classification
//!
//! Maps a page URL to one of the statically configured social-media sites,
//! or to nothing when the page is not tracked.

use url::Url;

/// A statically configured site that the tracker watches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedSite {
    /// Canonical domain suffix, without a leading `www.`
    pub domain_suffix: &'static str,
    /// Human-readable app name shown in statistics
    pub display_name: &'static str,
}

/// Sites watched by the tracker. Lookup walks this table in order and the
/// first matching suffix wins.
pub const TRACKED_SITES: &[TrackedSite] = &[
    TrackedSite {
        domain_suffix: "instagram.com",
        display_name: "Instagram",
    },
    TrackedSite {
        domain_suffix: "youtube.com",
        display_name: "YouTube",
    },
    TrackedSite {
        domain_suffix: "twitter.com",
        display_name: "Twitter",
    },
    TrackedSite {
        domain_suffix: "x.com",
        display_name: "Twitter",
    },
    TrackedSite {
        domain_suffix: "tiktok.com",
        display_name: "TikTok",
    },
    TrackedSite {
        domain_suffix: "reddit.com",
        display_name: "Reddit",
    },
];

/// Result of classifying a URL against [`TRACKED_SITES`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Host name with a leading `www.` removed (e.g. `instagram.com`)
    pub domain: String,
    /// The matched site entry
    pub site: &'static TrackedSite,
}

impl Classification {
    /// App name of the matched site
    pub fn app_name(&self) -> &'static str {
        self.site.display_name
    }
}

/// Extract the host of `url` with one leading `www.` label removed.
///
/// Returns `None` for unparseable URLs and URLs without a host
/// (e.g. `about:blank`).
///
/// # Examples
///
/// ```
/// use mindful_social::sites::extract_domain;
///
/// assert_eq!(extract_domain("https://www.reddit.com/r/rust").as_deref(), Some("reddit.com"));
/// assert_eq!(extract_domain("not a url"), None);
/// ```
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let stripped = host.strip_prefix("www.").unwrap_or(&host);
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_string())
}

/// Look up the tracked site for an already-extracted domain.
///
/// A suffix matches the whole domain or any subdomain of it, so
/// `m.youtube.com` is YouTube while `dropbox.com` is not `x.com`.
pub fn site_for_domain(domain: &str) -> Option<&'static TrackedSite> {
    TRACKED_SITES.iter().find(|site| {
        domain == site.domain_suffix
            || domain
                .strip_suffix(site.domain_suffix)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Classify a URL. Never fails: malformed input is simply untracked.
///
/// # Examples
///
/// ```
/// use mindful_social::sites::classify;
///
/// let c = classify("https://www.instagram.com/x").unwrap();
/// assert_eq!(c.domain, "instagram.com");
/// assert_eq!(c.app_name(), "Instagram");
/// assert!(classify("https://docs.rs").is_none());
/// ```
pub fn classify(url: &str) -> Option<Classification> {
    let domain = extract_domain(url)?;
    let site = site_for_domain(&domain)?;
    Some(Classification { domain, site })
}

/// Whether `url` belongs to any tracked site
pub fn is_tracked(url: &str) -> bool {
    classify(url).is_some()
}

/// App name for a domain, falling back to the domain itself
pub fn app_name_for(domain: &str) -> String {
    site_for_domain(domain)
        .map(|site| site.display_name.to_string())
        .unwrap_or_else(|| domain.to_string())
}
