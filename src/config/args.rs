//! Command-line overrides, flattenable into a host CLI with `#[command(flatten)]`

use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct VerifyArgs {
    /// Include local variables in tracebacks created by verify function.
    /// Enable: 1/yes/true/on. Disable: 0/no/false/off
    #[arg(long = "include-verify-local-vars", value_name = "VAL")]
    pub include_verify_local_vars: Option<String>,

    /// Include local variables in all verify tracebacks. Captured panics and
    /// errors carry no locals.
    /// Enable: 1/yes/true/on. Disable: 0/no/false/off
    #[arg(long = "include-all-local-vars", value_name = "VAL")]
    pub include_all_local_vars: Option<String>,

    /// Stop the traceback at the test function.
    /// Enable: 1/yes/true/on. Disable: 0/no/false/off
    #[arg(long = "traceback-stops-at-test-functions", value_name = "VAL")]
    pub traceback_stops_at_test_functions: Option<String>,

    /// Raise warnings (enabled) or just save the result (disabled).
    /// Enable: 1/yes/true/on. Disable: 0/no/false/off
    #[arg(long = "raise-warnings", value_name = "VAL")]
    pub raise_warnings: Option<String>,

    /// Print up to the maximum limit (integer) of stack trace entries
    #[arg(long = "maximum-traceback-depth", value_name = "N")]
    pub maximum_traceback_depth: Option<String>,

    /// Continue to the test call phase if the setup fails.
    /// Enable: 1/yes/true/on. Disable: 0/no/false/off
    #[arg(long = "continue-on-setup-failure", value_name = "VAL")]
    pub continue_on_setup_failure: Option<String>,

    /// Continue to the test call phase if the setup warns.
    /// Enable: 1/yes/true/on. Disable: 0/no/false/off
    #[arg(long = "continue-on-setup-warning", value_name = "VAL")]
    pub continue_on_setup_warning: Option<String>,
}

impl VerifyArgs {
    /// `(option name, value)` for every override given on the command line
    pub fn overrides(&self) -> Vec<(&'static str, &str)> {
        [
            ("include-verify-local-vars", &self.include_verify_local_vars),
            ("include-all-local-vars", &self.include_all_local_vars),
            (
                "traceback-stops-at-test-functions",
                &self.traceback_stops_at_test_functions,
            ),
            ("raise-warnings", &self.raise_warnings),
            ("maximum-traceback-depth", &self.maximum_traceback_depth),
            ("continue-on-setup-failure", &self.continue_on_setup_failure),
            ("continue-on-setup-warning", &self.continue_on_setup_warning),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}
