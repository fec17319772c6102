pub mod links;
pub mod profile;
pub mod text;

use crate::db::{LinkRecord, ProfileRecord};

pub struct ExtractedPage {
    pub links: Vec<LinkRecord>,
    pub profile: ProfileRecord,
}

/// Both extractors over the same markup. Neither depends on the other.
pub fn extract_page(markup: &str) -> ExtractedPage {
    ExtractedPage {
        links: links::extract(markup),
        profile: profile::extract(markup),
    }
}
