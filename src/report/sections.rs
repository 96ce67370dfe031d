// One declarative entry per report section. Each entry carries the tidy
// aggregate plus the display metadata the renderer needs; nothing here
// draws anything.

use chrono::Timelike;
use log::debug;
use serde::Serialize;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use survey_tally::*;

use crate::report::Selections;

/// Chart kinds the report renderer understands.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Strip,
    Treemap,
}

/// Fixed color mapping of the smartphone ownership pie.
const SMARTPHONE_COLORS: &[(&str, &str)] = &[
    ("I have an Android smartphone", "#2ba02b"),
    ("I don't have access to a smartphone", "#d62827"),
    ("I have an Apple/iOS smartphone", "#545c84"),
    (
        "I share an Android smartphone with my family or friends",
        "#7dc388",
    ),
    (
        "I share an Apple/iOS smartphone with my family or friends",
        "#808c9d",
    ),
];

/// All the sections of the report, in the report's fixed order, followed
/// by one section per free-text question.
pub fn report_sections(
    canonical: &[Respondent],
    freetext: &[FreeTextResponse],
    sel: &Selections,
) -> Vec<JSValue> {
    let mut sections = vec![
        completion_time(canonical),
        submissions_by_day(canonical),
        submissions_by_hour(canonical),
        referral_channels(canonical, &sel.country),
        preferred_language(canonical, &sel.country),
        ease_of_use_by_age(canonical, &sel.age_group),
        ease_of_use_by_education(canonical, &sel.education),
        frequency_by_education(canonical, &sel.education),
        frequency_by_country(canonical, &sel.country),
        smartphone_ownership(canonical, &sel.country),
        internet_vs_smartphone(canonical),
    ];
    for question in freetext_questions(freetext) {
        sections.push(freetext_section(freetext, &question));
    }
    debug!("assembled {} report sections", sections.len());
    sections
}

fn completion_time(rows: &[Respondent]) -> JSValue {
    let median = median_duration(rows.iter(), |r| r.time_taken);
    let strip: Vec<JSValue> = rows
        .iter()
        .map(|r| {
            json!({
                "seconds": r.time_taken.num_seconds(),
                "education_level": r.education_level,
            })
        })
        .collect();
    json!({
        "title": "Average time taken to complete the survey",
        "chart": ChartKind::Strip,
        "x_title": "Time (in seconds) in logscale",
        "legend": "Education Level",
        "median": median.map(|d| {
            let (minutes, seconds) = minutes_seconds(d);
            json!({"minutes": minutes, "seconds": seconds})
        }),
        "rows": strip,
    })
}

fn submissions_by_day(rows: &[Respondent]) -> JSValue {
    let tally = group_count_by(rows.iter(), |r| Some(r.submission_time.date_naive()));
    json!({
        "title": "Responses in timeseries",
        "chart": ChartKind::Line,
        "x_title": "Date",
        "y_title": "Respondents",
        "rows": tally
            .iter()
            .map(|(date, count)| json!({"key": date.to_string(), "count": count}))
            .collect::<Vec<_>>(),
    })
}

fn submissions_by_hour(rows: &[Respondent]) -> JSValue {
    let tally = group_count_by(rows.iter(), |r| Some(r.submission_time.hour()));
    json!({
        "title": "Responses by hour of the day",
        "chart": ChartKind::Bar,
        "x_title": "Hour",
        "y_title": "Respondents",
        "rows": tally
            .iter()
            .map(|(hour, count)| json!({"key": hour, "count": count}))
            .collect::<Vec<_>>(),
    })
}

fn referral_channels(rows: &[Respondent], country: &str) -> JSValue {
    let subset = select(rows, Dimension::CountryOfOrigin, country);
    let tally = group_count(
        subset,
        |r| r.referral_channel.as_deref(),
        GroupOrder::Fixed(REFERRAL_CHANNELS),
    );
    json!({
        "title": "How did you find the RSD website",
        "chart": ChartKind::Bar,
        "x_title": "How did you find RSD website today",
        "y_title": "Respondents",
        "legend": "How did you find RSD website today?",
        "filter": filter_js(Dimension::CountryOfOrigin, country),
        "rows": rows_js(&tally),
    })
}

fn preferred_language(rows: &[Respondent], country: &str) -> JSValue {
    let subset = select(rows, Dimension::CountryOfOrigin, country);
    let tally = group_count(subset, |r| r.language.as_deref(), GroupOrder::Observed);
    json!({
        "title": "What is your preferred language of communication?",
        "chart": ChartKind::Bar,
        "x_title": "What is your preferred language of communication?",
        "y_title": "Respondents",
        "filter": filter_js(Dimension::CountryOfOrigin, country),
        "rows": rows_js(&tally),
    })
}

fn ease_of_use(rows: &[Respondent], dim: Dimension, selection: &str) -> JSValue {
    let subset = select(rows, dim, selection);
    let tally = group_count(
        subset,
        |r| r.ease_of_use.as_deref(),
        GroupOrder::Fixed(EASE_SCALE),
    );
    json!({
        "title": "How easy is RSD website to use?",
        "chart": ChartKind::Bar,
        "x_title": "How easy is RSD website to use?",
        "y_title": "Respondents",
        "legend": "How easy is RSD website to use?",
        "filter": filter_js(dim, selection),
        "rows": rows_js(&tally),
    })
}

fn ease_of_use_by_age(rows: &[Respondent], age_group: &str) -> JSValue {
    ease_of_use(rows, Dimension::AgeGroup, age_group)
}

fn ease_of_use_by_education(rows: &[Respondent], education: &str) -> JSValue {
    ease_of_use(rows, Dimension::EducationLevel, education)
}

fn usage_frequency(rows: &[Respondent], dim: Dimension, selection: &str) -> JSValue {
    let subset = select(rows, dim, selection);
    let tally = group_count(
        subset,
        |r| r.usage_frequency.as_deref(),
        GroupOrder::Fixed(FREQUENCY_SCALE),
    );
    json!({
        "title": "How often do you use our website?",
        "chart": ChartKind::Bar,
        "x_title": "How often do you use our website?",
        "y_title": "Respondents",
        "legend": "How often do you use our website?",
        "filter": filter_js(dim, selection),
        "rows": rows_js(&tally),
    })
}

fn frequency_by_education(rows: &[Respondent], education: &str) -> JSValue {
    usage_frequency(rows, Dimension::EducationLevel, education)
}

fn frequency_by_country(rows: &[Respondent], country: &str) -> JSValue {
    usage_frequency(rows, Dimension::CountryOfOrigin, country)
}

fn smartphone_ownership(rows: &[Respondent], country: &str) -> JSValue {
    let subset = select(rows, Dimension::CountryOfOrigin, country);
    let tally = group_count(subset, |r| r.smartphone.as_deref(), GroupOrder::Observed);
    let colors: JSMap<String, JSValue> = SMARTPHONE_COLORS
        .iter()
        .map(|(owner, color)| (owner.to_string(), json!(color)))
        .collect();
    json!({
        "title": "Do you have your own smartphone",
        "chart": ChartKind::Pie,
        "filter": filter_js(Dimension::CountryOfOrigin, country),
        "colors": colors,
        "rows": rows_js(&tally),
    })
}

fn internet_vs_smartphone(rows: &[Respondent]) -> JSValue {
    let tally = group_count_pairs(
        rows.iter(),
        |r| r.internet_access.as_deref(),
        |r| r.smartphone.as_deref(),
    );
    json!({
        "title": "Do you have access to the internet vs owning smartphone",
        "chart": ChartKind::Treemap,
        "rows": tally
            .iter()
            .map(|((source, target), count)| {
                json!({"source": source, "target": target, "count": count})
            })
            .collect::<Vec<_>>(),
    })
}

fn freetext_section(freetext: &[FreeTextResponse], question: &str) -> JSValue {
    let tally = freetext_counts(freetext, question);
    json!({
        "title": question,
        "chart": ChartKind::Bar,
        "x_title": question,
        "y_title": "Respondents",
        "rows": rows_js(&tally),
    })
}

fn rows_js(tally: &[(String, u64)]) -> Vec<JSValue> {
    tally
        .iter()
        .map(|(key, count)| json!({"key": key, "count": count}))
        .collect()
}

fn filter_js(dim: Dimension, value: &str) -> JSValue {
    json!({"dimension": dimension_name(dim), "value": value})
}

fn dimension_name(dim: Dimension) -> &'static str {
    match dim {
        Dimension::CountryOfOrigin => "country_of_origin",
        Dimension::AgeGroup => "age_group",
        Dimension::EducationLevel => "education_level",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset};

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn respondent(id: &str, country: &str, referral: &str) -> Respondent {
        Respondent {
            id: id.to_string(),
            start: ts("2021-02-01T10:00:00+02:00"),
            end: ts("2021-02-01T10:05:00+02:00"),
            submission_time: ts("2021-02-01T10:05:30+02:00"),
            time_taken: Duration::minutes(5),
            duplicate: false,
            country_of_origin: Some(country.to_string()),
            age_group: None,
            education_level: None,
            language: None,
            usage_frequency: None,
            smartphone: None,
            internet_access: None,
            referral_channel: Some(referral.to_string()),
            ease_of_use: None,
            recontact_consent: None,
            other_services: None,
        }
    }

    #[test]
    fn referral_section_respects_the_country_filter() {
        let rows = vec![
            respondent("1", "Sudan", "Other"),
            respondent("2", "Sudan", "Other"),
            respondent("3", "Eritrea", "Another UNHCR website"),
        ];

        let section = referral_channels(&rows, "Sudan");
        let tally = section["rows"].as_array().unwrap();
        // Fixed scale: every channel is present, observed or not.
        assert_eq!(tally.len(), REFERRAL_CHANNELS.len());
        let other = tally
            .iter()
            .find(|row| row["key"] == json!("Other"))
            .unwrap();
        assert_eq!(other["count"], json!(2));
        let unhcr = tally
            .iter()
            .find(|row| row["key"] == json!("Another UNHCR website"))
            .unwrap();
        assert_eq!(unhcr["count"], json!(0));
        assert_eq!(section["filter"]["value"], json!("Sudan"));
    }

    #[test]
    fn unknown_country_renders_an_all_zero_section() {
        let rows = vec![respondent("1", "Sudan", "Other")];
        let section = referral_channels(&rows, "Atlantis");
        let tally = section["rows"].as_array().unwrap();
        assert_eq!(tally.len(), REFERRAL_CHANNELS.len());
        assert!(tally.iter().all(|row| row["count"] == json!(0)));
    }

    #[test]
    fn observed_sections_drop_unseen_groups() {
        let rows = vec![respondent("1", "Sudan", "Other")];
        let section = preferred_language(&rows, ALL_COUNTRIES);
        // Nobody answered the language question.
        assert!(section["rows"].as_array().unwrap().is_empty());
    }

    #[test]
    fn treemap_counts_answer_pairs() {
        let mut rows = vec![
            respondent("1", "Sudan", "Other"),
            respondent("2", "Sudan", "Other"),
        ];
        for r in rows.iter_mut() {
            r.internet_access = Some("Yes".to_string());
            r.smartphone = Some("I have an Android smartphone".to_string());
        }
        let section = internet_vs_smartphone(&rows);
        let tally = section["rows"].as_array().unwrap();
        assert_eq!(tally.len(), 1);
        assert_eq!(tally[0]["source"], json!("Yes"));
        assert_eq!(tally[0]["count"], json!(2));
    }

    #[test]
    fn completion_section_has_median_and_strip_rows() {
        let rows = vec![
            respondent("1", "Sudan", "Other"),
            respondent("2", "Sudan", "Other"),
        ];
        let section = completion_time(&rows);
        assert_eq!(section["median"], json!({"minutes": 5, "seconds": 0}));
        assert_eq!(section["rows"].as_array().unwrap().len(), 2);
        assert_eq!(section["chart"], json!("strip"));
    }
}
