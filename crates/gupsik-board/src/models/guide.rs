//! Help guide markdown.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Help guide split into its title line and markdown body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpGuide {
    pub title: String,
    pub body: String,
}

impl HelpGuide {
    /// Split the guide: the first line must start with `#`.
    pub fn parse(text: &str) -> Result<Self> {
        let rest = text.strip_prefix('#').ok_or(Error::MissingTitle)?;
        let (title, body) = rest.split_once('\n').ok_or(Error::MissingTitle)?;

        Ok(Self {
            title: title.trim_start_matches('#').trim().to_string(),
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_title_from_body() {
        let guide = HelpGuide::parse("# 사용 방법\n\n- 날짜를 고르세요\n").unwrap();
        assert_eq!(guide.title, "사용 방법");
        assert_eq!(guide.body, "\n- 날짜를 고르세요\n");
    }

    #[test]
    fn rejects_guide_without_title() {
        assert!(matches!(
            HelpGuide::parse("no title\nbody"),
            Err(Error::MissingTitle)
        ));
    }

    #[test]
    fn rejects_title_without_newline() {
        assert!(HelpGuide::parse("# only a title").is_err());
    }
}
