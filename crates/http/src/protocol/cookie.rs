use std::fmt;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `Set-Cookie` entry of a response.
///
/// Attributes that are `None`, `false` or a zero `max_age` are not rendered.
/// A negative `max_age` is rendered as `0`, expiring the cookie immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Option<SystemTime>,
    pub max_age: i64,
    pub same_site: Option<SameSite>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            expires: None,
            max_age: 0,
            same_site: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn builder(name: impl Into<String>, value: impl Into<String>) -> CookieBuilder {
        CookieBuilder { cookie: Self::new(name, value) }
    }
}

#[derive(Debug, Clone)]
pub struct CookieBuilder {
    cookie: Cookie,
}

impl CookieBuilder {
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.cookie.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.cookie.expires = Some(expires);
        self
    }

    #[must_use]
    pub fn max_age(mut self, max_age: i64) -> Self {
        self.cookie.max_age = max_age;
        self
    }

    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.cookie.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.cookie.http_only = http_only;
        self
    }

    pub fn build(&self) -> Cookie {
        self.cookie.clone()
    }
}

impl From<CookieBuilder> for Cookie {
    fn from(builder: CookieBuilder) -> Self {
        builder.cookie
    }
}
