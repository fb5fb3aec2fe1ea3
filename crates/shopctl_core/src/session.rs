use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// An authenticated admin-API session, carried as the exact `Cookie` header
/// value to replay on every request. Always passed explicitly to API calls;
/// there is no ambient session state anywhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    header: String,
}

impl SessionCookie {
    pub fn from_header(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            bail!("session cookie header is empty");
        }
        Ok(Self {
            header: trimmed.to_string(),
        })
    }

    /// Build the replay header from the `Set-Cookie` headers of a login
    /// response: keep the `name=value` part of each cookie, join with `"; "`.
    pub fn from_set_cookie_headers<I, S>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts = Vec::new();
        for header in headers {
            let pair = header
                .as_ref()
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            if !pair.is_empty() {
                parts.push(pair);
            }
        }
        if parts.is_empty() {
            bail!("login response carried no session cookies");
        }
        Ok(Self {
            header: parts.join("; "),
        })
    }

    /// Parse a Netscape-format cookie jar as written by `curl -c`.
    pub fn from_cookie_jar(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read cookie jar {}", path.display()))?;
        let mut parts = Vec::new();
        for raw_line in text.lines() {
            // #HttpOnly_ prefixes a valid cookie line; every other # line is a comment.
            let line = raw_line.strip_prefix("#HttpOnly_").unwrap_or(raw_line);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() >= 7 {
                parts.push(format!("{}={}", fields[5], fields[6]));
            }
        }
        if parts.is_empty() {
            bail!(
                "cookie jar {} holds no cookies; log in again to refresh it",
                path.display()
            );
        }
        Ok(Self {
            header: parts.join("; "),
        })
    }

    pub fn header_value(&self) -> &str {
        &self.header
    }

    /// Persist the header line for reuse by later manual invocations.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, format!("{}\n", self.header))
            .with_context(|| format!("failed to write cookie file {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read cookie file {}", path.display()))?;
        let line = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| anyhow::anyhow!("cookie file {} is empty", path.display()))?;
        Self::from_header(line)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::SessionCookie;

    #[test]
    fn set_cookie_headers_keep_only_name_value_pairs() {
        let session = SessionCookie::from_set_cookie_headers([
            "session=abc123; Path=/; HttpOnly; Secure",
            "session.sig=def456; Path=/",
        ])
        .expect("session");
        assert_eq!(session.header_value(), "session=abc123; session.sig=def456");
    }

    #[test]
    fn empty_set_cookie_list_is_an_error() {
        let error =
            SessionCookie::from_set_cookie_headers(Vec::<String>::new()).expect_err("must fail");
        assert!(error.to_string().contains("no session cookies"));
    }

    #[test]
    fn cookie_jar_parses_curl_format() {
        let temp = tempdir().expect("tempdir");
        let jar = temp.path().join("cookie-plain.jar");
        fs::write(
            &jar,
            "# Netscape HTTP Cookie File\n\
             # https://curl.se/docs/http-cookies.html\n\
             \n\
             #HttpOnly_shop.example.org\tFALSE\t/\tTRUE\t0\tsession\tabc123\n\
             shop.example.org\tFALSE\t/\tTRUE\t0\tsession.sig\tdef456\n",
        )
        .expect("write jar");

        let session = SessionCookie::from_cookie_jar(&jar).expect("session");
        assert_eq!(session.header_value(), "session=abc123; session.sig=def456");
    }

    #[test]
    fn cookie_jar_with_only_comments_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let jar = temp.path().join("cookie-plain.jar");
        fs::write(&jar, "# Netscape HTTP Cookie File\n").expect("write jar");

        let error = SessionCookie::from_cookie_jar(&jar).expect_err("must fail");
        assert!(error.to_string().contains("holds no cookies"));
    }

    #[test]
    fn cookie_file_round_trip() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("cookie.txt");
        let session = SessionCookie::from_header("session=abc123").expect("session");
        session.save(&path).expect("save");

        let loaded = SessionCookie::load(&path).expect("load");
        assert_eq!(loaded, session);
    }

    #[test]
    fn blank_header_is_an_error() {
        assert!(SessionCookie::from_header("   ").is_err());
    }
}
