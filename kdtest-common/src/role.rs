//! The two executables under test.

use std::fmt;

/// One of the two programs the harness builds, installs and runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The privileged key daemon.
    Daemon,
    /// The launcher that starts the daemon and reads its output.
    Parent,
}

impl Role {
    /// Both roles in the order the pipeline attempts them.
    pub const fn pipeline_order() -> [Role; 2] {
        [Role::Parent, Role::Daemon]
    }

    /// Lowercase noun used in console status lines.
    pub const fn noun(&self) -> &'static str {
        match self {
            Role::Daemon => "daemon",
            Role::Parent => "parent",
        }
    }

    /// Capitalized label used in build-argument log titles.
    pub const fn title(&self) -> &'static str {
        match self {
            Role::Daemon => "Daemon",
            Role::Parent => "Parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}
