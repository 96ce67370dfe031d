use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;

use once_cell::unsync::OnceCell;
use serde::Serialize;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use survey_tally::*;

use crate::args::Args;

pub mod loader;
pub mod sections;

/// The published export of the February 2021 survey.
pub const DATA_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vTKoYQrQUedW9pe9OR5N29XFAHvJBBrXIKmmG3E-nVRy-2ZPTSt1TjzwVe8KQq3Ng/pub?gid=1630645316&single=true&output=csv";

/// The survey collected around 1.1k submissions; the cap only guards
/// against a runaway export.
pub const DEFAULT_ROW_LIMIT: usize = 1200;

pub const DEFAULT_FREETEXT_PATH: &str = "data/freetext_responses.csv";

/// Failures that abort a report run: the export cannot be fetched, or its
/// content cannot be coerced to the expected shape. There is no partial
/// report. Empty aggregation results are values, never errors.
#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Failed to fetch the survey export from {url}"))]
    Fetch { source: reqwest::Error, url: String },
    #[snafu(display("Error opening data file {path}"))]
    OpeningData {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading tabular data"))]
    CsvRead { source: csv::Error },
    #[snafu(display("The export is missing the required column {name:?}"))]
    MissingColumn { name: String },
    #[snafu(display("Row {lineno}: {column} value {value:?} is not a timestamp"))]
    MalformedTimestamp {
        column: String,
        value: String,
        lineno: usize,
    },
    #[snafu(display("Row {lineno}: count value {value:?} is not an integer"))]
    MalformedCount { value: String, lineno: usize },
    #[snafu(display("Error writing report to {path}"))]
    WritingReport {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

/// The cleaned snapshot every report section reads from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PrimaryData {
    pub canonical: Vec<Respondent>,
    pub duplicate_count: usize,
    pub total: usize,
}

/// Owns the loaded tables for one report run.
///
/// Each table is loaded at most once; the same immutable snapshot is
/// served to every section of the run and dropped with the context.
pub struct RunContext {
    data_source: String,
    freetext_source: String,
    row_limit: usize,
    primary: OnceCell<PrimaryData>,
    freetext: OnceCell<Vec<FreeTextResponse>>,
}

impl RunContext {
    pub fn new(data_source: String, freetext_source: String, row_limit: usize) -> RunContext {
        RunContext {
            data_source,
            freetext_source,
            row_limit,
            primary: OnceCell::new(),
            freetext: OnceCell::new(),
        }
    }

    pub fn from_args(args: &Args) -> RunContext {
        RunContext::new(
            args.data.clone().unwrap_or_else(|| DATA_URL.to_string()),
            args.freetext
                .clone()
                .unwrap_or_else(|| DEFAULT_FREETEXT_PATH.to_string()),
            args.limit.unwrap_or(DEFAULT_ROW_LIMIT),
        )
    }

    /// The deduplicated respondent table, loaded on first access.
    pub fn primary(&self) -> ReportResult<&PrimaryData> {
        self.primary.get_or_try_init(|| {
            let rows = loader::load_primary(&self.data_source, self.row_limit)?;
            let total = rows.len();
            let (canonical, duplicate_count) = dedupe(rows);
            info!(
                "{} respondents, {} responded more than once, analyzing {}",
                total,
                duplicate_count,
                canonical.len()
            );
            Ok(PrimaryData {
                canonical,
                duplicate_count,
                total,
            })
        })
    }

    /// The coded free-text table, loaded on first access.
    pub fn freetext(&self) -> ReportResult<&[FreeTextResponse]> {
        self.freetext
            .get_or_try_init(|| loader::load_freetext(&self.freetext_source))
            .map(|rows| rows.as_slice())
    }
}

/// The current value of each report dropdown. Defaults to the sentinels,
/// i.e. no filtering.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct Selections {
    pub country: String,
    pub age_group: String,
    pub education: String,
}

impl Selections {
    pub fn from_args(args: &Args) -> Selections {
        Selections {
            country: args
                .country
                .clone()
                .unwrap_or_else(|| ALL_COUNTRIES.to_string()),
            age_group: args
                .age_group
                .clone()
                .unwrap_or_else(|| ALL_AGE_GROUPS.to_string()),
            education: args
                .education
                .clone()
                .unwrap_or_else(|| ALL_EDUCATION_GROUPS.to_string()),
        }
    }
}

/// Assembles the whole report: a summary header, the dropdown option
/// lists, and one entry per section in the report's fixed order.
pub fn build_report_js(
    primary: &PrimaryData,
    freetext: &[FreeTextResponse],
    sel: &Selections,
) -> JSValue {
    let median = median_duration(primary.canonical.iter(), |r| r.time_taken);
    json!({
        "summary": {
            "title": "RSD Website Survey Analysis",
            "respondents": primary.total,
            "duplicates": primary.duplicate_count,
            "analyzed": primary.canonical.len(),
            "median_completion": median.map(|d| {
                let (minutes, seconds) = minutes_seconds(d);
                json!({"minutes": minutes, "seconds": seconds})
            }),
            "controls": {
                "countries": country_options(&primary.canonical),
                "age_groups": age_group_options(),
                "education_levels": education_options(),
            },
            "selections": sel,
        },
        "sections": sections::report_sections(&primary.canonical, freetext, sel),
    })
}

pub fn run_report(args: &Args) -> ReportResult<()> {
    let ctx = RunContext::from_args(args);
    let sel = Selections::from_args(args);
    debug!("selections: {:?}", sel);

    let primary = ctx.primary()?;
    let freetext = ctx.freetext()?;

    let report = build_report_js(primary, freetext, &sel);
    let pretty = serde_json::to_string_pretty(&report).context(ParsingJsonSnafu {})?;

    match args.out.as_deref() {
        None | Some("stdout") => println!("{}", pretty),
        Some(path) => {
            fs::write(path, &pretty).context(WritingReportSnafu { path })?;
            info!("report written to {}", path);
        }
    }

    // The reference report, if provided for comparison.
    if let Some(reference_path) = args.reference.as_deref() {
        let reference = read_reference(reference_path)?;
        let pretty_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
        if pretty_reference != pretty {
            warn!("Found differences with the reference report");
            print_diff(pretty_reference.as_str(), pretty.as_str(), "\n");
            whatever!("Difference detected between generated report and reference report");
        }
    }

    Ok(())
}

fn read_reference(path: &str) -> ReportResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningDataSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("reference report: {:?}", js);
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
_ID,Start,End,_Submission_Time,duplicated_contact,what's your country of origin?,your age,your current education level,what is your preferred language of communication?,how often do you use our website?,do you have your own smartphone?,do you always have access to the internet?,how did you find our website today?,how easy is our website to use?,may we contact you again in the future?,would you use other unhcr services online?
1,2021-02-01T10:00:00+02:00,2021-02-01T10:04:30+02:00,2021-02-01T10:05:00+02:00,0,Sudan,25-34,High school / college,Arabic,Often (daily),I have an Android smartphone,Yes,Other,Easy,Yes,Yes
2,2021-02-01T11:00:00+02:00,2021-02-01T11:03:00+02:00,2021-02-01T11:03:10+02:00,1,Eritrea,18-24,PhD,Tigrinya,This is the first time,I have an Apple/iOS smartphone,No,Other,Very easy,No,Yes
3,2021-02-02T09:00:00+02:00,2021-02-02T09:06:00+02:00,2021-02-02T09:06:30+02:00,0,Eritrea,25-34,,,,,,,,,
";

    fn write_sample(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, EXPORT).unwrap();
        path
    }

    #[test]
    fn primary_is_loaded_once_per_run() {
        let path = write_sample("svyrep_report_cache_test.csv");
        let ctx = RunContext::new(path.display().to_string(), "unused".to_string(), 1200);

        let first = ctx.primary().unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.duplicate_count, 1);
        assert_eq!(first.canonical.len(), 2);

        // The second access serves the exact same snapshot.
        let second = ctx.primary().unwrap();
        assert!(std::ptr::eq(first as *const PrimaryData, second));
    }

    #[test]
    fn row_limit_is_honored_by_the_context() {
        let path = write_sample("svyrep_report_limit_test.csv");
        let ctx = RunContext::new(path.display().to_string(), "unused".to_string(), 1);
        assert_eq!(ctx.primary().unwrap().total, 1);
    }

    #[test]
    fn report_covers_every_section() {
        let path = write_sample("svyrep_report_full_test.csv");
        let ctx = RunContext::new(path.display().to_string(), "unused".to_string(), 1200);
        let primary = ctx.primary().unwrap();

        let freetext = vec![FreeTextResponse {
            question: "How can we improve the RSD website?".to_string(),
            response: "More languages".to_string(),
            count: 12,
        }];
        let sel = Selections {
            country: ALL_COUNTRIES.to_string(),
            age_group: ALL_AGE_GROUPS.to_string(),
            education: ALL_EDUCATION_GROUPS.to_string(),
        };
        let report = build_report_js(primary, &freetext, &sel);

        assert_eq!(report["summary"]["respondents"], json!(3));
        assert_eq!(report["summary"]["duplicates"], json!(1));
        assert_eq!(report["summary"]["analyzed"], json!(2));
        // Rows 1 and 3 took 4m30s and 6m: the median is 5m15s.
        assert_eq!(
            report["summary"]["median_completion"],
            json!({"minutes": 5, "seconds": 15})
        );
        // 11 fixed sections plus one per free-text question.
        assert_eq!(report["sections"].as_array().unwrap().len(), 12);
        assert_eq!(
            report["summary"]["controls"]["countries"],
            json!([ALL_COUNTRIES, "Eritrea", "Sudan"])
        );
    }
}
