use reqwest::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// Base URL of the LiveWall API plus the endpoint paths built on top of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn uploads(&self) -> String {
        format!("{}/api/uploads", self.base_url)
    }

    pub fn upload_by_id(&self, id: &str) -> String {
        format!("{}/api/uploads/{id}", self.base_url)
    }

    pub fn bulk_uploads(&self) -> String {
        format!("{}/api/uploads/bulk", self.base_url)
    }

    pub fn batch_uploads(&self) -> String {
        format!("{}/api/uploads/batch", self.base_url)
    }

    pub fn users(&self) -> String {
        format!("{}/api/users", self.base_url)
    }

    pub fn user_by_id(&self, id: &str) -> String {
        format!("{}/api/users/{id}", self.base_url)
    }

    pub fn user_login(&self) -> String {
        format!("{}/api/users/login", self.base_url)
    }

    pub fn admin_create(&self) -> String {
        format!("{}/api/users/admin/create", self.base_url)
    }

    /// Resolve a photo reference to something fetchable. Absolute URLs pass
    /// through, server relative paths get the base URL prepended.
    pub fn image_url(&self, path: Option<&str>) -> Option<String> {
        match path {
            None | Some("") => None,
            Some(p) if p.starts_with("http") => Some(p.to_string()),
            Some(p) if p.starts_with('/') => Some(format!("{}{p}", self.base_url)),
            Some(p) => Some(format!("{}/{p}", self.base_url)),
        }
    }

    /// https, or a loopback host. Camera capture is refused otherwise.
    pub fn is_secure_origin(&self) -> bool {
        let Ok(url) = Url::parse(&self.base_url) else {
            return false;
        };
        url.scheme() == "https" || matches!(url.host_str(), Some("localhost" | "127.0.0.1"))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HostPattern {
    scheme: Option<&'static str>,
    host: String,
    port: Option<u16>,
    path_prefix: Option<String>,
}

/// Which remote hosts the wall is willing to load images from.
#[derive(Debug, Clone)]
pub struct ImageHostPolicy {
    patterns: Vec<HostPattern>,
}

impl Default for ImageHostPolicy {
    fn default() -> Self {
        let mut patterns = Vec::new();
        for scheme in ["https", "http"] {
            patterns.push(HostPattern {
                scheme: Some(scheme),
                host: "localhost".into(),
                port: Some(3001),
                path_prefix: Some("/uploads/".into()),
            });
        }
        for host in ["**.s3.**.amazonaws.com", "**.s3.amazonaws.com"] {
            patterns.push(HostPattern {
                scheme: Some("https"),
                host: host.into(),
                port: None,
                path_prefix: None,
            });
        }
        Self { patterns }
    }
}

impl ImageHostPolicy {
    /// Allow everything served by the configured API under `/uploads/`, plus
    /// any extra host names (exact or glob, `*` one label, `**` several).
    pub fn for_api(api: &ApiConfig, extra_hosts: &[String]) -> Self {
        let mut policy = Self::default();
        if let Ok(url) = Url::parse(api.base_url()) {
            if let Some(host) = url.host_str() {
                policy.patterns.push(HostPattern {
                    scheme: None,
                    host: host.to_string(),
                    port: url.port(),
                    path_prefix: Some("/uploads/".into()),
                });
            }
        }
        for host in extra_hosts {
            policy.patterns.push(HostPattern {
                scheme: Some("https"),
                host: host.clone(),
                port: None,
                path_prefix: None,
            });
        }
        policy
    }

    pub fn allows(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        self.patterns.iter().any(|p| {
            p.scheme.is_none_or(|s| s == url.scheme())
                && p.port.is_none_or(|port| url.port() == Some(port))
                && p.path_prefix
                    .as_deref()
                    .is_none_or(|prefix| url.path().starts_with(prefix))
                && host_matches(&p.host, host)
        })
    }
}

fn host_matches(pattern: &str, host: &str) -> bool {
    let pat: Vec<&str> = pattern.split('.').collect();
    let labels: Vec<&str> = host.split('.').collect();
    labels_match(&pat, &labels)
}

fn labels_match(pat: &[&str], labels: &[&str]) -> bool {
    match (pat.first(), labels.first()) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(&"**"), Some(_)) => {
            (1..=labels.len()).any(|n| labels_match(&pat[1..], &labels[n..]))
        }
        (Some(&"*"), Some(_)) => labels_match(&pat[1..], &labels[1..]),
        (Some(p), Some(l)) => p.eq_ignore_ascii_case(l) && labels_match(&pat[1..], &labels[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_built_from_the_base() {
        let api = ApiConfig::new("https://wall.example.com/");
        assert_eq!(api.uploads(), "https://wall.example.com/api/uploads");
        assert_eq!(api.upload_by_id("42"), "https://wall.example.com/api/uploads/42");
        assert_eq!(api.bulk_uploads(), "https://wall.example.com/api/uploads/bulk");
        assert_eq!(api.batch_uploads(), "https://wall.example.com/api/uploads/batch");
        assert_eq!(api.user_by_id("7"), "https://wall.example.com/api/users/7");
        assert_eq!(api.user_login(), "https://wall.example.com/api/users/login");
        assert_eq!(
            api.admin_create(),
            "https://wall.example.com/api/users/admin/create"
        );
    }

    #[test]
    fn image_urls() {
        let api = ApiConfig::default();
        assert_eq!(api.image_url(None), None);
        assert_eq!(api.image_url(Some("")), None);
        assert_eq!(
            api.image_url(Some("/uploads/a.jpg")).as_deref(),
            Some("http://localhost:3001/uploads/a.jpg")
        );
        assert_eq!(
            api.image_url(Some("https://cdn.example.com/a.jpg")).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn secure_origin() {
        assert!(ApiConfig::new("https://wall.example.com").is_secure_origin());
        assert!(ApiConfig::new("http://localhost:3001").is_secure_origin());
        assert!(ApiConfig::new("http://127.0.0.1:3001").is_secure_origin());
        assert!(!ApiConfig::new("http://169.254.83.107:3001").is_secure_origin());
        assert!(!ApiConfig::new("not a url").is_secure_origin());
    }

    #[test]
    fn host_policy() {
        let api = ApiConfig::new("http://169.254.83.107:3001");
        let policy = ImageHostPolicy::for_api(&api, &["d1w558igkzurxw.cloudfront.net".into()]);

        assert!(policy.allows("http://localhost:3001/uploads/a.jpg"));
        assert!(policy.allows("http://169.254.83.107:3001/uploads/a.jpg"));
        assert!(policy.allows("https://livewall-uploads.s3.eu-north-1.amazonaws.com/x/a.jpg"));
        assert!(policy.allows("https://bucket.s3.amazonaws.com/a.jpg"));
        assert!(policy.allows("https://d1w558igkzurxw.cloudfront.net/a.jpg"));

        assert!(!policy.allows("http://localhost:3001/secrets/a.jpg"));
        assert!(!policy.allows("http://bucket.s3.amazonaws.com/a.jpg"));
        assert!(!policy.allows("https://evil.example.com/a.jpg"));
        assert!(!policy.allows("https://s3.amazonaws.com/a.jpg"));
    }
}
