use std::path::PathBuf;

/// Values supplied on the command line. Empty vectors and `None` mean
/// "not given" and leave lower-precedence values in place.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub artifact_name: Option<String>,
    pub no_prune: bool,
}
