use crate::config::DEFAULT_PROFILE;
use crate::credentials::Credentials;

/// Receives credentials the user asked to have exported (`-e`).
pub trait ExportSink {
    fn emit(&mut self, profile: &str, credentials: &Credentials);
}

/// Prints shell assignments on stdout, ready for `eval "$(ssosync -e)"`.
#[derive(Debug, Default)]
pub struct ShellExport;

impl ExportSink for ShellExport {
    fn emit(&mut self, profile: &str, credentials: &Credentials) {
        print!("{}", render(profile, credentials));
    }
}

fn keyword() -> &'static str {
    if cfg!(windows) {
        "set"
    } else {
        "export"
    }
}

pub fn render(profile: &str, credentials: &Credentials) -> String {
    let kw = keyword();
    let expiration = credentials.expiration_rfc3339();
    let mut out = String::new();
    if profile != DEFAULT_PROFILE {
        out.push_str(&format!("# {profile}\n"));
    }
    for (name, value) in [
        ("AWS_ACCESS_KEY_ID", credentials.access_key_id.as_str()),
        ("AWS_SECRET_ACCESS_KEY", credentials.secret_access_key.as_str()),
        ("AWS_SESSION_TOKEN", credentials.session_token.as_str()),
        ("AWS_CREDENTIAL_EXPIRATION", expiration.as_str()),
    ] {
        out.push_str(&format!("{kw} {name}={value}\n"));
    }
    out
}
