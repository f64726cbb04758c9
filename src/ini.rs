//! Minimal INI document used for the AWS config and credentials files.
//!
//! Section and key order is preserved so that rewriting the credentials file
//! only touches the section being refreshed. Indented lines continue the
//! previous value (AWS uses this for nested settings such as `s3 =`).
//! Comments are not carried over on write.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim().to_string();
                doc.section_mut(&name);
                continue;
            }

            let Some(current) = doc.sections.last_mut() else {
                // keys before the first section header have nowhere to go
                continue;
            };

            let continuation = raw.starts_with(&[' ', '\t'][..]);
            if continuation {
                if let Some((_, value)) = current.entries.last_mut() {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(line);
                    continue;
                }
            }

            if let Some((key, value)) = line.split_once('=') {
                current
                    .entries
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        doc
    }

    /// Section names in file order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key` in `section`, creating the section when needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        let entries = &mut self.section_mut(section).entries;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => entries.push((key.to_string(), value)),
        }
    }

    fn section_mut(&mut self, name: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                if value.contains('\n') {
                    writeln!(f, "{key} =")?;
                    for line in value.lines() {
                        writeln!(f, "    {line}")?;
                    }
                } else {
                    writeln!(f, "{key} = {value}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# leading comment
[default]
region = ap-southeast-2
output=json

[profile dev]
sso_start_url = https://example.awsapps.com/start
; comment inside
sso_role_name = Admin
s3 =
    max_concurrent_requests = 10
    max_queue_size = 100
";

    #[test]
    fn test_parse_sections_in_order() {
        let doc = IniDocument::parse(SAMPLE);
        let sections: Vec<_> = doc.sections().collect();
        assert_eq!(sections, vec!["default", "profile dev"]);
    }

    #[test]
    fn test_get_trims_keys_and_values() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.get("default", "output"), Some("json"));
        assert_eq!(doc.get("profile dev", "sso_role_name"), Some("Admin"));
        assert_eq!(doc.get("profile dev", "missing"), None);
        assert_eq!(doc.get("nope", "region"), None);
    }

    #[test]
    fn test_continuation_lines() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(
            doc.get("profile dev", "s3"),
            Some("max_concurrent_requests = 10\nmax_queue_size = 100")
        );
    }

    #[test]
    fn test_set_updates_and_creates() {
        let mut doc = IniDocument::parse(SAMPLE);
        doc.set("default", "region", "us-east-1");
        doc.set("renamed", "aws_access_key_id", "AKIA");

        assert_eq!(doc.get("default", "region"), Some("us-east-1"));
        assert_eq!(doc.get("renamed", "aws_access_key_id"), Some("AKIA"));
        assert!(doc.has_section("renamed"));
    }

    #[test]
    fn test_display_reparses_to_same_document() {
        let doc = IniDocument::parse(SAMPLE);
        let rendered = doc.to_string();
        assert!(rendered.starts_with("[default]\nregion = ap-southeast-2\n"));
        assert_eq!(IniDocument::parse(&rendered), doc);
    }
}
