//! The homepage smoke check

use crate::scenario::{Scenario, Step};

pub const NAME: &str = "homepage";
pub const ROOT_PATH: &str = "/";
pub const EXPECTED_STATUS: u16 = 200;
pub const TITLE_PATTERN: &str = r"^Gitea: Git with a cup of tea\s*$";
pub const LOGO_SELECTOR: &str = ".logo";
pub const LOGO_ATTRIBUTE: &str = "src";
pub const LOGO_SRC: &str = "/assets/img/logo.svg";
pub const SCREENSHOT_FILE: &str = "screenshot.png";

/// The same scenario as shipped in `scenarios/homepage.yaml`
pub const SCENARIO_YAML: &str = include_str!("../scenarios/homepage.yaml");

/// Status, then title, then logo, then the screenshot.
pub fn scenario() -> Scenario {
    Scenario {
        name: NAME.to_string(),
        description: "Homepage loads, shows the Gitea title and logo, and is captured for review".to_string(),
        tags: vec!["smoke".to_string()],
        steps: vec![
            Step::Goto {
                path: ROOT_PATH.to_string(),
            },
            Step::ExpectStatus {
                status: EXPECTED_STATUS,
            },
            Step::ExpectTitle {
                pattern: TITLE_PATTERN.to_string(),
            },
            Step::ExpectAttribute {
                selector: LOGO_SELECTOR.to_string(),
                name: LOGO_ATTRIBUTE.to_string(),
                value: LOGO_SRC.to_string(),
            },
            Step::Screenshot {
                path: SCREENSHOT_FILE.to_string(),
                full_page: true,
            },
        ],
    }
}
