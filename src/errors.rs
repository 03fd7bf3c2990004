use thiserror::Error;

/// Parsing is all-or-nothing: any of these aborts the whole file.
/// Everything else that is not understood becomes an unknown line and
/// survives serialization verbatim.
#[derive(Error, Debug, PartialEq)]
pub enum ParseZoneErr {
    #[error("dns entry: `{0}` omits its host but no prior entry supplies one")]
    NoPriorHostErr(String),

    #[error("dns entry: `{0}` record type is not recognised")]
    ValidTypeErr(String),

    #[error("zone file: `{path:?}` error: {err:?}")]
    IOError { path: String, err: String },
}
