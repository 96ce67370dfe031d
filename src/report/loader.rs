// Primitives for reading the survey export and the coded free-text table.

use std::collections::HashMap;
use std::fs;
use std::io::Read;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};
use snafu::prelude::*;

use survey_tally::{FreeTextResponse, Respondent};

use crate::report::*;

// Export column names, after lowercasing the headers.
const COL_ID: &str = "_id";
const COL_START: &str = "start";
const COL_END: &str = "end";
const COL_SUBMISSION_TIME: &str = "_submission_time";
const COL_DUPLICATE: &str = "duplicated_contact";
const COL_COUNTRY: &str = "what's your country of origin?";
const COL_AGE: &str = "your age";
const COL_EDUCATION: &str = "your current education level";
const COL_LANGUAGE: &str = "what is your preferred language of communication?";
const COL_FREQUENCY: &str = "how often do you use our website?";
const COL_SMARTPHONE: &str = "do you have your own smartphone?";
const COL_INTERNET: &str = "do you always have access to the internet?";
const COL_REFERRAL: &str = "how did you find our website today?";
const COL_EASE: &str = "how easy is our website to use?";
const COL_RECONTACT: &str = "may we contact you again in the future?";
const COL_OTHER_SERVICES: &str = "would you use other unhcr services online?";

/// Reads at most `row_limit` rows of the survey export. `source` is an
/// HTTP(S) URL or a local file path.
pub fn load_primary(source: &str, row_limit: usize) -> ReportResult<Vec<Respondent>> {
    let text = fetch_text(source)?;
    parse_primary(text.as_bytes(), row_limit)
}

fn fetch_text(source: &str) -> ReportResult<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("fetching survey export from {}", source);
        let response = reqwest::blocking::get(source)
            .context(FetchSnafu { url: source })?
            .error_for_status()
            .context(FetchSnafu { url: source })?;
        response.text().context(FetchSnafu { url: source })
    } else {
        info!("reading survey export from {}", source);
        fs::read_to_string(source).context(OpeningDataSnafu { path: source })
    }
}

/// Parses the survey export. Headers are matched case-insensitively; the
/// three timestamp columns must parse on every row and `time_taken` is
/// derived as `end - start` (negative values pass through).
pub fn parse_primary<R: Read>(input: R, row_limit: usize) -> ReportResult<Vec<Respondent>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context(CsvReadSnafu {})?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();
    let column = |name: &str| -> ReportResult<usize> {
        columns
            .get(name)
            .copied()
            .context(MissingColumnSnafu { name })
    };

    let id_col = column(COL_ID)?;
    let start_col = column(COL_START)?;
    let end_col = column(COL_END)?;
    let submission_col = column(COL_SUBMISSION_TIME)?;
    let duplicate_col = column(COL_DUPLICATE)?;
    let country_col = column(COL_COUNTRY)?;
    let age_col = column(COL_AGE)?;
    let education_col = column(COL_EDUCATION)?;
    let language_col = column(COL_LANGUAGE)?;
    let frequency_col = column(COL_FREQUENCY)?;
    let smartphone_col = column(COL_SMARTPHONE)?;
    let internet_col = column(COL_INTERNET)?;
    let referral_col = column(COL_REFERRAL)?;
    let ease_col = column(COL_EASE)?;
    let recontact_col = column(COL_RECONTACT)?;
    let other_services_col = column(COL_OTHER_SERVICES)?;

    let mut rows: Vec<Respondent> = Vec::new();
    for (idx, record_r) in reader.records().take(row_limit).enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let record = record_r.context(CsvReadSnafu {})?;
        debug!("parse_primary: line {}: {:?}", lineno, record);

        let start = timestamp(&record, start_col, COL_START, lineno)?;
        let end = timestamp(&record, end_col, COL_END, lineno)?;
        let submission_time = timestamp(&record, submission_col, COL_SUBMISSION_TIME, lineno)?;
        let duplicate = !matches!(field(&record, duplicate_col).trim(), "" | "0" | "0.0");

        rows.push(Respondent {
            id: field(&record, id_col).to_string(),
            start,
            end,
            submission_time,
            time_taken: end - start,
            duplicate,
            country_of_origin: answer(&record, country_col),
            age_group: answer(&record, age_col),
            education_level: answer(&record, education_col),
            language: answer(&record, language_col),
            usage_frequency: answer(&record, frequency_col),
            smartphone: answer(&record, smartphone_col),
            internet_access: answer(&record, internet_col),
            referral_channel: answer(&record, referral_col),
            ease_of_use: answer(&record, ease_col),
            recontact_consent: answer(&record, recontact_col),
            other_services: answer(&record, other_services_col),
        });
    }
    info!("parsed {} survey rows", rows.len());
    Ok(rows)
}

/// Reads the coded free-text table (columns: question, response, count).
pub fn load_freetext(path: &str) -> ReportResult<Vec<FreeTextResponse>> {
    info!("reading coded free-text responses from {}", path);
    let file = fs::File::open(path).context(OpeningDataSnafu { path })?;
    parse_freetext(file)
}

pub fn parse_freetext<R: Read>(input: R) -> ReportResult<Vec<FreeTextResponse>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context(CsvReadSnafu {})?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();
    let column = |name: &str| -> ReportResult<usize> {
        columns
            .get(name)
            .copied()
            .context(MissingColumnSnafu { name })
    };
    let question_col = column("question")?;
    let response_col = column("response")?;
    let count_col = column("count")?;

    let mut rows: Vec<FreeTextResponse> = Vec::new();
    for (idx, record_r) in reader.records().enumerate() {
        let lineno = idx + 2;
        let record = record_r.context(CsvReadSnafu {})?;
        let raw_count = field(&record, count_col);
        let count = raw_count
            .trim()
            .parse::<u64>()
            .ok()
            .context(MalformedCountSnafu {
                value: raw_count,
                lineno,
            })?;
        rows.push(FreeTextResponse {
            question: field(&record, question_col).to_string(),
            response: field(&record, response_col).to_string(),
            count,
        });
    }
    Ok(rows)
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("")
}

/// Empty cells are absent answers, not empty strings.
fn answer(record: &csv::StringRecord, idx: usize) -> Option<String> {
    let value = field(record, idx).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn timestamp(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
    lineno: usize,
) -> ReportResult<DateTime<FixedOffset>> {
    let raw = field(record, idx);
    parse_timestamp(raw).context(MalformedTimestampSnafu {
        column,
        value: raw,
        lineno,
    })
}

/// Accepts the RFC 3339 stamps the collection platform produces, plus the
/// offset-less forms the spreadsheet export sometimes falls back to
/// (read as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for format in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const EXPORT: &str = "\
_ID,Start,End,_Submission_Time,duplicated_contact,what's your country of origin?,your age,your current education level,what is your preferred language of communication?,how often do you use our website?,do you have your own smartphone?,do you always have access to the internet?,how did you find our website today?,how easy is our website to use?,may we contact you again in the future?,would you use other unhcr services online?
1,2021-02-01T10:00:00+02:00,2021-02-01T10:04:30+02:00,2021-02-01T10:05:00+02:00,0,Sudan,25-34,High school / college,Arabic,Often (daily),I have an Android smartphone,Yes,Other,Easy,Yes,Yes
2,2021-02-01 11:00:00,2021-02-01 10:58:00,2021-02-01 11:00:30,1,Eritrea,18-24,PhD,Tigrinya,This is the first time,I have an Apple/iOS smartphone,No,Other,Very easy,No,Yes
3,2021-02-02T09:00:00+02:00,2021-02-02T09:06:00+02:00,2021-02-02T09:06:30+02:00,0,,,,,,,,,,,
";

    #[test]
    fn lowercases_headers_and_derives_time_taken() {
        let rows = parse_primary(EXPORT.as_bytes(), 1200).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[0].time_taken, Duration::seconds(270));
        assert_eq!(rows[0].country_of_origin.as_deref(), Some("Sudan"));
        assert_eq!(rows[0].ease_of_use.as_deref(), Some("Easy"));
        assert!(!rows[0].duplicate);
        assert!(rows[1].duplicate);
        // Skipped answers come back as None.
        assert_eq!(rows[2].country_of_origin, None);
        assert_eq!(rows[2].usage_frequency, None);
    }

    #[test]
    fn negative_durations_pass_through() {
        let rows = parse_primary(EXPORT.as_bytes(), 1200).unwrap();
        // Row 2 ends before it starts in the export.
        assert_eq!(rows[1].time_taken, Duration::minutes(-2));
    }

    #[test]
    fn row_limit_caps_the_parse() {
        let rows = parse_primary(EXPORT.as_bytes(), 2).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn missing_column_fails_the_load() {
        let export = "_id,start,end\n1,2021-02-01T10:00:00+02:00,2021-02-01T10:04:30+02:00\n";
        let err = parse_primary(export.as_bytes(), 1200).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { .. }));
    }

    #[test]
    fn malformed_timestamp_fails_the_load() {
        let export = EXPORT.replace("2021-02-01T10:04:30+02:00", "not-a-date");
        let err = parse_primary(export.as_bytes(), 1200).unwrap_err();
        match err {
            ReportError::MalformedTimestamp { column, lineno, .. } => {
                assert_eq!(column, COL_END);
                assert_eq!(lineno, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn freetext_table_round() {
        let table = "\
question,response,count
How can we improve the RSD website?,More languages,12
How can we improve the RSD website?,Simpler wording,7
What were you looking for today?,My case status,30
";
        let rows = parse_freetext(table.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].response, "More languages");
        assert_eq!(rows[0].count, 12);
        assert_eq!(rows[2].question, "What were you looking for today?");
    }

    #[test]
    fn non_integer_count_fails_the_load() {
        let table = "question,response,count\nQ,R,many\n";
        let err = parse_freetext(table.as_bytes()).unwrap_err();
        match err {
            ReportError::MalformedCount { value, lineno } => {
                assert_eq!(value, "many");
                assert_eq!(lineno, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
