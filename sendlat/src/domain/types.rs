//! Core domain newtypes

use std::fmt;

/// Process ID (TGID), as userspace sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_displays_as_number() {
        assert_eq!(Pid(1234).to_string(), "1234");
    }
}
