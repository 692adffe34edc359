//! Resolves which repository to query and which token to query it with.
//!
//! Input comes from an [`InputSource`]: either a terminal prompt or values
//! injected through flags and environment variables. The choice of source is
//! made once by configuration; [`resolve`] only validates what it is given.

use std::fmt;
use std::io::{self, BufRead, Write};

use serde::Serialize;
use url::Url;

use crate::error::{Result, StatsError};

/// `owner/name` of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    /// Parse `https://host/owner/name`. Anything after the name segment
    /// (`/tree/main`, `/issues`, a query string) is ignored, and a trailing
    /// `.git` is dropped from the name.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || StatsError::InvalidRepositoryUrl {
            url: input.to_string(),
        };

        let url = Url::parse(input.trim()).map_err(|_| invalid())?;
        if url.host_str().is_none() {
            return Err(invalid());
        }

        let mut segments = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|s| !s.is_empty());

        let owner = segments.next().ok_or_else(invalid)?;
        let name = segments.next().ok_or_else(invalid)?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Personal access token. Deliberately has no `Display` and a redacted `Debug`.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(StatsError::MissingCredential {
                hint: "set ACCESS_TOKEN or pass --token",
            });
        }
        Ok(Self(token.to_string()))
    }

    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Where the repository URL and token come from.
pub trait InputSource {
    fn repo_url(&mut self) -> Result<String>;
    fn token(&mut self) -> Result<String>;
}

const TOKEN_QUESTION: &str = "Enter personal access token: ";

type SecretReader = Box<dyn FnMut(&str) -> io::Result<String>>;

/// Asks on `output`, reads one line per answer from `input`. When a secret
/// reader is set, the token is read through it instead.
pub struct Prompt<R, W> {
    input: R,
    output: W,
    secret: Option<SecretReader>,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            secret: None,
        }
    }

    /// Read the token with `reader`, which is given the question and must not
    /// echo the answer.
    pub fn with_secret_reader<F>(mut self, reader: F) -> Self
    where
        F: FnMut(&str) -> io::Result<String> + 'static,
    {
        self.secret = Some(Box::new(reader));
        self
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> InputSource for Prompt<R, W> {
    fn repo_url(&mut self) -> Result<String> {
        self.ask("Enter GitHub repo address (e.g., https://github.com/owner/repo): ")
    }

    fn token(&mut self) -> Result<String> {
        match self.secret.as_mut() {
            Some(read) => Ok(read(TOKEN_QUESTION)?.trim().to_string()),
            None => self.ask(TOKEN_QUESTION),
        }
    }
}

/// Values supplied up front; a missing value is reported as empty so
/// validation fails instead of blocking on a prompt.
pub struct Injected {
    pub repo_url: Option<String>,
    pub token: Option<String>,
}

impl InputSource for Injected {
    fn repo_url(&mut self) -> Result<String> {
        Ok(self.repo_url.clone().unwrap_or_default())
    }

    fn token(&mut self) -> Result<String> {
        Ok(self.token.clone().unwrap_or_default())
    }
}

/// Injected values win; the fallback source is only asked for what is missing.
pub struct Layered<F> {
    pub injected: Injected,
    pub fallback: F,
}

impl<F: InputSource> InputSource for Layered<F> {
    fn repo_url(&mut self) -> Result<String> {
        match self.injected.repo_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url.to_string()),
            _ => self.fallback.repo_url(),
        }
    }

    fn token(&mut self) -> Result<String> {
        match self.injected.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
            _ => self.fallback.token(),
        }
    }
}

/// Read and validate the target repository and token.
pub fn resolve(source: &mut dyn InputSource) -> Result<(RepositoryRef, AccessToken)> {
    let repo = RepositoryRef::parse(&source.repo_url()?)?;
    let token = AccessToken::new(&source.token()?)?;
    tracing::debug!(repository = %repo, "resolved target repository");
    Ok((repo, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    #[test]
    fn parses_owner_and_name() {
        let repo = RepositoryRef::parse("https://github.com/acme/widget").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widget");
        assert_eq!(repo.to_string(), "acme/widget");
    }

    #[test]
    fn trailing_segments_do_not_leak_into_name() {
        for url in [
            "https://github.com/acme/widget/",
            "https://github.com/acme/widget/tree/main/src",
            "https://github.com/acme/widget.git",
            "https://github.com/acme/widget?tab=readme",
            "  https://github.com/acme/widget\n",
        ] {
            let repo = RepositoryRef::parse(url).unwrap();
            assert_eq!(
                repo,
                RepositoryRef {
                    owner: "acme".to_string(),
                    name: "widget".to_string()
                },
                "{url}"
            );
        }
    }

    #[test]
    fn rejects_missing_name() {
        for url in [
            "https://github.com/acme",
            "https://github.com/acme/",
            "https://github.com/",
            "https://github.com/acme/.git",
            "acme/widget",
            "",
        ] {
            let err = RepositoryRef::parse(url).unwrap_err();
            assert!(
                matches!(err, StatsError::InvalidRepositoryUrl { .. }),
                "{url}: {err}"
            );
        }
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("ghp_supersecret").unwrap();
        let shown = format!("{token:?}");
        assert!(!shown.contains("supersecret"));
        assert_eq!(token.secret(), "ghp_supersecret");
    }

    #[test]
    fn blank_token_is_missing_credential() {
        let err = AccessToken::new("   ").unwrap_err();
        assert!(matches!(err, StatsError::MissingCredential { .. }));
    }

    #[test]
    fn resolves_from_prompt() {
        let input = Cursor::new("https://github.com/acme/widget\nghp_abc\n");
        let mut output = Vec::new();
        let mut prompt = Prompt::new(input, &mut output);

        let (repo, token) = resolve(&mut prompt).unwrap();
        assert_eq!(repo.to_string(), "acme/widget");
        assert_eq!(token.secret(), "ghp_abc");

        let asked = String::from_utf8(output).unwrap();
        assert!(asked.contains("Enter GitHub repo address"));
        assert!(!asked.contains("ghp_abc"));
    }

    #[test]
    fn token_goes_through_secret_reader() {
        let asked = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&asked);
        let mut output = Vec::new();
        {
            let input = Cursor::new("https://github.com/acme/widget\n");
            let mut prompt = Prompt::new(input, &mut output).with_secret_reader(move |question| {
                seen.borrow_mut().push(question.to_string());
                Ok("ghp_hidden\n".to_string())
            });

            let (repo, token) = resolve(&mut prompt).unwrap();
            assert_eq!(repo.to_string(), "acme/widget");
            assert_eq!(token.secret(), "ghp_hidden");
        }
        assert_eq!(*asked.borrow(), vec!["Enter personal access token: ".to_string()]);

        let written = String::from_utf8(output).unwrap();
        assert!(written.contains("repo address"));
        assert!(!written.contains("access token"));
        assert!(!written.contains("ghp_hidden"));
    }

    #[test]
    fn secret_reader_failure_is_input_error() {
        let mut prompt = Prompt::new(Cursor::new(""), Vec::new()).with_secret_reader(|_| {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no tty"))
        });
        let err = prompt.token().unwrap_err();
        assert!(matches!(err, StatsError::Input { .. }));
    }

    #[test]
    fn injected_without_token_fails() {
        let mut source = Injected {
            repo_url: Some("https://github.com/acme/widget".to_string()),
            token: None,
        };
        let err = resolve(&mut source).unwrap_err();
        assert!(matches!(err, StatsError::MissingCredential { .. }));
    }

    #[test]
    fn injected_without_url_fails() {
        let mut source = Injected {
            repo_url: None,
            token: Some("ghp_abc".to_string()),
        };
        let err = resolve(&mut source).unwrap_err();
        assert!(matches!(err, StatsError::InvalidRepositoryUrl { .. }));
    }

    #[test]
    fn layered_only_prompts_for_missing_values() {
        let mut output = Vec::new();
        let mut source = Layered {
            injected: Injected {
                repo_url: Some("https://github.com/acme/widget".to_string()),
                token: None,
            },
            fallback: Prompt::new(Cursor::new("ghp_typed\n"), &mut output),
        };

        let (repo, token) = resolve(&mut source).unwrap();
        assert_eq!(repo.name, "widget");
        assert_eq!(token.secret(), "ghp_typed");

        let asked = String::from_utf8(output).unwrap();
        assert!(!asked.contains("repo address"));
        assert!(asked.contains("access token"));
    }
}
