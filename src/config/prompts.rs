//! Prompt templates for silver-anno.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use crate::annotator::SceneLabel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub chyron: FramePrompt,
    pub credit: FramePrompt,
}

/// System instructions for one frame type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePrompt {
    pub system: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            chyron: FramePrompt {
                system: CHYRON_SYSTEM.to_string(),
            },
            credit: FramePrompt {
                system: CREDIT_SYSTEM.to_string(),
            },
        }
    }
}

const CHYRON_SYSTEM: &str = r#"
    INSTRUCTIONS: Your job is to match roles and fillers (names) in the following OCR text, which represents a screenshot taken from a public broadcast video. The frame type is CHYRON, meaning the names will typically -- but not always -- appear before their role. Also, typically -- but not always -- there will only be a single name, though it may be attached to multiple roles. Do NOT correct any misspellings. There may be text in the input that is not explicitly matched with a role or name; in those cases, tag them with O. 
    There should be no roles that aren't co-indexed with a filler, and no fillers that aren't co-indexed with a role. If you try to tag a filler with a role that doesn't appear in a corresponding filler or vice-versa, it should be tagged O instead. Many OCR errors may be present; just do your best to figure out what the underlying structure/meaning of the text.

    Please use the following format based in BIO format with indices:

    Format: Tag the end of each word with @(BIO rfb tag), where BIO rfb tag is one of the following:

    BR:i - meaning "begin role i" where i is an index
    IR:i - meaning "in role i"
    BF:i - meaning "begin filler corresponding with role i"
    IF:i - meaning "continue filler corresponding with role i"
    O - meaning not a role or filler

    EXAMPLES:
    OCR STRING: Stanley Kubrick Writer Director of The Shining
    OUTPUT:
    Stanley@BF:1 Kubrick@IF:1 Director@BR:1

    OCR STRING: - :0Meena BoseU.S Military Academy, West Point
    OUTPUT:
    :0Meena@BF:1 BoseU.S@IF:1 Military@BR:1 Academy,@IR:1 West@IR:1 Point@IR:1

    OCR STRING: Indianapolis CLARENCE PAGE Chitago Tribune
    OUTPUT:
    Indianapolis@O CLARENCE@BF:1 PAGE@IF:1 Chitago@BR:1 Tribune@IR:1

    OCR STRING: REP. WIC COURTER GRD MORRI IS COUNTYL

    OUTPUT: REP.@BF:1 WIC@IF:1 COURTER@IF:1 GRD@BR:1 MORRI@IR:1 IS@IR:1 COUNTYL@IR:1

    The most important thing to remember: THE OUTPUT SHOULD BE IDENTICAL TO THE INPUT, VERBATIM, WITH THE ROLE-FILLER TAGS APPENDED TO THE END OF EACH WORD! Do not alter the input text in any other way.
    "#;

const CREDIT_SYSTEM: &str = r#"
    INSTRUCTIONS: Your job is to match roles and fillers (names) in the following OCR text, which represents a screenshot taken from a public broadcast video. The frame type is CREDIT, meaning the names will typically -- but not always -- appear AFTER their role. There may be multiple names corresponding with a given role. Do NOT correct any misspellings. There may be text in the input that is not explicitly matched with a role or name; in those cases, tag them with O. 
    There should be no roles that aren't co-indexed with a filler, and no fillers that aren't co-indexed with a role. If you try to tag a filler with a role that doesn't appear in a corresponding filler or vice-versa, it should be tagged O instead. Many OCR errors may be present; just do your best to figure out what the underlying structure/meaning of the text. When in doubt, tag O! Be conservative i.e. use lots of O's.

    Please use the following format based in BIO format with indices:

    Format: Tag the end of each word with @(BIO rfb tag), where BIO rfb tag is one of the following:

    BR:i - meaning "begin role i" where i is an index
    IR:i - meaning "in role i"
    BF:i - meaning "begin filler corresponding with role i"
    IF:i - meaning "continue filler corresponding with role i"
    O - meaning not a role or filler

    EXAMPLES:
    OCR STRING: Director Stanley Kubrick Actors Jack Nicholson Shelley Duvall
    OUTPUT:
    Director@BR:1 Stanley@BF:1 Kubrick@IF:1 Actors@BR:2 Jack@BF:2 Nicholson@IF:2 Shelley@BF:2 Duvall@IF:2

    OCR STRING: John Doe PRODUCTION ASSISTANT LuAnne Halligan POST PRODUCTION SUPERVISOR Maggi s66ug

    OUTPUT: John@O Doe@O PRODUCTION@BR:1 ASSISTANT@IR:1 LuAnne@BF:1 Halligan@IF:1 POST@BR:2 PRODUCTION@IR:2 SUPERVISOR@IR:2 Maggi@BF:2 s66ug@IF:2

    OCR STRING: ENG Crews RUSSELL MARHULL GARY ALLEN CHARLES IDE ED LEE RIC NELSON DAVID PICKERAL STEVE LEDERER BILL MCMILLIN WIC VAN VRANKEN

    OUTPUT: ENG@BR:1 Crews@IR:1 RUSSELL@BF:1 MARHULL@IF:1 GARY@BF:1 ALLEN@IF:1 CHARLES@BF:1 IDE@IF:1 ED@BF:1 LEE@IF:1 RIC@BF:1 NELSON@IF:1 DAVID@BF:1 PICKERAL@IF:1 STEVE@BF:1 LEDERER@IF:1 BILL@BF:1 MCMILLIN@IF:1 WIC@BF:1 VAN@IF:1 VRANKEN@IF:1

    The most important thing to remember: THE OUTPUT SHOULD BE IDENTICAL TO THE INPUT, VERBATIM, WITH THE ROLE-FILLER TAGS APPENDED TO THE END OF EACH WORD! Do not alter the input text in any other way.    "#;

impl Prompts {
    /// Load prompts, replacing defaults with files from the custom directory if given.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let chyron_path = custom_path.join("chyron.toml");
            if chyron_path.exists() {
                let content = std::fs::read_to_string(&chyron_path)?;
                prompts.chyron = toml::from_str(&content)?;
            }

            let credit_path = custom_path.join("credit.toml");
            if credit_path.exists() {
                let content = std::fs::read_to_string(&credit_path)?;
                prompts.credit = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// System prompt for a frame type.
    pub fn system_for(&self, label: SceneLabel) -> &str {
        match label {
            SceneLabel::Chyron => &self.chyron.system,
            SceneLabel::Credit => &self.credit.system,
        }
    }
}
