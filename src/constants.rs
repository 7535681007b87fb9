pub mod fields {

    pub const ID: &str = "_id";

    pub const YOUTUBE_ID: &str = "youtubeId";

    pub const TITLE: &str = "title";

    pub const DESCRIPTION: &str = "description";

    pub const PUBLISHED_AT: &str = "publishedAt";
}

/// Index names as the document store derives them from the key specs.
pub mod indexes {

    pub const PUBLISHED_AT_DESC: &str = "publishedAt_-1";

    pub const TITLE_DESCRIPTION_TEXT: &str = "title_text_description_text";

    pub const YOUTUBE_ID_UNIQUE: &str = "youtubeId_1";
}

pub mod errors {

    /// Server error code for a unique index violation.
    pub const DUPLICATE_KEY: i32 = 11000;
}

pub mod youtube {

    pub const RESULT_TYPE_VIDEO: &str = "video";

    pub const SEARCH_PARTS: &str = "id,snippet";
}
