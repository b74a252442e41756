//! Capability tokens a work item can require from the worker that runs it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LanepoolError;

/// A named hardware or software precondition, e.g. an inserted SIM card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenProperty {
    SimCard,
    UiccSimCard,
    SecureElementSimCard,
    GsmSimCard,
    CdmaSimCard,
    OrangeSimCard,
    DualSim,
}

/// Set of tokens, ordered so that logs and reports are stable.
pub type TokenSet = BTreeSet<TokenProperty>;

impl TokenProperty {
    pub const ALL: [TokenProperty; 7] = [
        TokenProperty::SimCard,
        TokenProperty::UiccSimCard,
        TokenProperty::SecureElementSimCard,
        TokenProperty::GsmSimCard,
        TokenProperty::CdmaSimCard,
        TokenProperty::OrangeSimCard,
        TokenProperty::DualSim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenProperty::SimCard => "SIM_CARD",
            TokenProperty::UiccSimCard => "UICC_SIM_CARD",
            TokenProperty::SecureElementSimCard => "SECURE_ELEMENT_SIM_CARD",
            TokenProperty::GsmSimCard => "GSM_SIM_CARD",
            TokenProperty::CdmaSimCard => "CDMA_SIM_CARD",
            TokenProperty::OrangeSimCard => "ORANGE_SIM_CARD",
            TokenProperty::DualSim => "DUAL_SIM",
        }
    }
}

impl fmt::Display for TokenProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenProperty {
    type Err = LanepoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| LanepoolError::UnknownToken(s.to_string()))
    }
}

/// Whether a worker offering `capabilities` can run an item requiring `required`.
pub fn satisfies(capabilities: &TokenSet, required: &TokenSet) -> bool {
    required.is_subset(capabilities)
}

/// Render a token set as `A,B,C` for log fields.
pub fn format_tokens(tokens: &TokenSet) -> String {
    tokens
        .iter()
        .map(TokenProperty::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
