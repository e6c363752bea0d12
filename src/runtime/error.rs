use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Alignment store at {:?} could not be opened{}.", path, Error::format_msg_as_detail(msg))]
    StoreOpen {
        path: std::path::PathBuf,
        msg: Option<String>,
    },

    #[error("Overlap graph construction failed{}", Error::format_msg_as_detail(msg))]
    GraphBuild { msg: Option<String> },

    #[error("Alignment index cannot be built{}", Error::format_msg_as_detail(msg))]
    AlignmentIndex { msg: Option<String> },

    #[error("Failed parsing {}{}", context, Error::format_msg_as_detail(msg))]
    ParseError {
        context: String,
        msg: Option<String>,
    },

    #[error("Invalid configuration: {msg}")]
    InvalidConfig { msg: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hts(#[from] rust_htslib::errors::Error),
}

impl Error {
    #[cold]
    pub fn store_open<P: AsRef<std::path::Path>, M: Into<String>>(path: P, msg: Option<M>) -> Self {
        Error::StoreOpen {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn graph_build<M: Into<String>>(msg: Option<M>) -> Self {
        Error::GraphBuild {
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn alignment_index<M: Into<String>>(msg: Option<M>) -> Self {
        Error::AlignmentIndex {
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, msg: Option<M>) -> Self {
        Error::ParseError {
            context: context.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn invalid_config<M: Into<String>>(msg: M) -> Self {
        Error::InvalidConfig { msg: msg.into() }
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_formatting() {
        let err = Error::store_open("missing.bam", Some("no such file"));
        assert_eq!(
            err.to_string(),
            "Alignment store at \"missing.bam\" could not be opened (no such file)."
        );

        let err = Error::graph_build(None::<String>);
        assert_eq!(err.to_string(), "Overlap graph construction failed");
    }
}
