use clap::Parser;

/// Builds the RSD website usability survey report.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (url or file path) Overrides the location of the published survey export.
    /// Defaults to the spreadsheet export the February 2021 survey was published at.
    #[clap(long, value_parser)]
    pub data: Option<String>,

    /// (file path) The table of manually coded free-text responses
    /// (columns: question, response, count).
    #[clap(long, value_parser)]
    pub freetext: Option<String>,

    /// Caps the number of rows read from the survey export.
    #[clap(short, long, value_parser)]
    pub limit: Option<usize>,

    /// (file path, 'stdout' or empty) If specified, the report will be written in JSON
    /// format to the given location instead of the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference report in JSON format. If provided, svyrep will
    /// check that the generated report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// Country of origin applied to the country-filtered sections.
    /// Defaults to "All the countries".
    #[clap(long, value_parser)]
    pub country: Option<String>,

    /// Age group applied to the age-filtered sections. Defaults to "All age groups".
    #[clap(long, value_parser)]
    pub age_group: Option<String>,

    /// Education level applied to the education-filtered sections.
    /// Defaults to "All education groups".
    #[clap(long, value_parser)]
    pub education: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
