// ********* Input data structures ***********

use chrono::{DateTime, Duration, FixedOffset};

/// One survey submission, as found in the published export.
///
/// The identifier and the three timestamps are always present in the
/// export. Every categorical answer is optional: respondents may skip any
/// question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Respondent {
    pub id: String,
    /// When the respondent opened the form.
    pub start: DateTime<FixedOffset>,
    /// When the respondent submitted the form.
    pub end: DateTime<FixedOffset>,
    /// Server-side submission timestamp.
    pub submission_time: DateTime<FixedOffset>,
    /// `end - start`. The export contains a handful of negative values
    /// and they are kept as-is.
    pub time_taken: Duration,
    /// Flagged by the collection platform as a repeat submission.
    pub duplicate: bool,
    pub country_of_origin: Option<String>,
    pub age_group: Option<String>,
    pub education_level: Option<String>,
    pub language: Option<String>,
    pub usage_frequency: Option<String>,
    pub smartphone: Option<String>,
    pub internet_access: Option<String>,
    pub referral_channel: Option<String>,
    pub ease_of_use: Option<String>,
    pub recontact_consent: Option<String>,
    pub other_services: Option<String>,
}

/// One coded answer to an open-ended question, with the number of
/// respondents who gave it. The counts are produced by manual coding of
/// the free text and do not have to sum to the respondent total.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FreeTextResponse {
    pub question: String,
    pub response: String,
    pub count: u64,
}

// ********* Configuration **********

/// The categorical axes a report section can filter on before
/// aggregating.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Dimension {
    CountryOfOrigin,
    AgeGroup,
    EducationLevel,
}

impl Dimension {
    /// The per-dimension "show everything" selector value. The sentinel
    /// belongs to the report vocabulary and is matched verbatim.
    pub fn sentinel(&self) -> &'static str {
        match self {
            Dimension::CountryOfOrigin => ALL_COUNTRIES,
            Dimension::AgeGroup => ALL_AGE_GROUPS,
            Dimension::EducationLevel => ALL_EDUCATION_GROUPS,
        }
    }

    /// The answer of one respondent along this dimension.
    pub fn value<'a>(&self, r: &'a Respondent) -> Option<&'a str> {
        match self {
            Dimension::CountryOfOrigin => r.country_of_origin.as_deref(),
            Dimension::AgeGroup => r.age_group.as_deref(),
            Dimension::EducationLevel => r.education_level.as_deref(),
        }
    }
}

/// How the groups of a tally are ordered in the output.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum GroupOrder<'a> {
    /// Only the values observed in the data, in first-seen order.
    Observed,
    /// A fixed category scale. Every entry of the scale appears in the
    /// output in scale order; groups absent from the data get a zero
    /// count. Values outside the scale are dropped.
    Fixed(&'a [&'a str]),
}

pub const ALL_COUNTRIES: &str = "All the countries";
pub const ALL_AGE_GROUPS: &str = "All age groups";
pub const ALL_EDUCATION_GROUPS: &str = "All education groups";

/// Age brackets as offered by the survey form, youngest first.
pub const AGE_GROUPS: &[&str] = &[
    "Under 18",
    "18-24",
    "25-34",
    "35-44",
    "45-54",
    "55-64",
    "65+",
];

pub const EDUCATION_LEVELS: &[&str] = &[
    "No formal education",
    "Elementary school",
    "High school / college",
    "Bachelor's degree / technical college",
    "Masters degree",
    "PhD",
];

/// Likert scale of the ease-of-use question.
pub const EASE_SCALE: &[&str] = &[
    "Very easy",
    "Easy",
    "Neither easy nor difficult",
    "Difficult",
    "Very difficult",
];

pub const FREQUENCY_SCALE: &[&str] = &[
    "Often (daily)",
    "Regularly (weekly)",
    "Sometimes (monthly)",
    "Rarely (every few months)",
    "This is the first time",
];

/// Referral channels in the order the report charts them.
pub const REFERRAL_CHANNELS: &[&str] = &[
    "I found you on Google (or another search engine)",
    "I typed the website address (URL) in directly",
    "Another UNHCR website",
    "A link on Twitter / Facebook / Instagram",
    "Other",
    "A link from WhatsApp / Viber / Telegram",
    "A link on another website",
];
