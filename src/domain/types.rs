use crate::domain::TraceId;
use time::OffsetDateTime;

/// Fixed-name files a benchmark harness may leave in a session directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Artifact {
    AccessLog,
    SqlLog,
    PerfLog,
    VmStat,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::AccessLog,
        Artifact::SqlLog,
        Artifact::PerfLog,
        Artifact::VmStat,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::AccessLog => "access.log",
            Self::SqlLog => "sql.log",
            Self::PerfLog => "perf.log",
            Self::VmStat => "vmstat.log",
        }
    }
}

/// An (artifact, program) binding exposed as a filtered view.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterKind {
    Kataribe,
    Alp,
    SqlParse,
    PerfParse,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Kataribe,
        FilterKind::Alp,
        FilterKind::SqlParse,
        FilterKind::PerfParse,
    ];

    pub fn artifact(self) -> Artifact {
        match self {
            Self::Kataribe | Self::Alp => Artifact::AccessLog,
            Self::SqlParse => Artifact::SqlLog,
            Self::PerfParse => Artifact::PerfLog,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Kataribe => "kataribe",
            Self::Alp => "alp",
            Self::SqlParse => "sqlparse",
            Self::PerfParse => "perfparse",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TraceSession {
    pub id: TraceId,
    pub exec_at: OffsetDateTime,
    pub access_log_size: u64,
    pub sql_log_size: u64,
    pub perf_log_size: u64,
}
