use std::fmt;

use serde::{Serialize, Serializer};

use crate::slurm::{split_list, Memberships, PartitionRecord, PartitionState};

/// A single character of the status column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    /// Default partition
    Default,
    /// Hidden partition
    Hidden,
    /// None of the user's accounts may use the partition
    NoAccounts,
    /// Some of the user's accounts may not use the partition
    SomeAccounts,
    NoQos,
    SomeQos,
    NoGroups,
    SomeGroups,
    /// Only root may use the partition, or root may not
    RootRestricted,
    Inactive,
    Draining,
    Down,
    /// Jobs require a reservation
    ReservationRequired,
}

impl StatusCode {
    pub fn as_char(&self) -> char {
        match self {
            StatusCode::Default => '*',
            StatusCode::Hidden => '.',
            StatusCode::NoAccounts => 'A',
            StatusCode::SomeAccounts => 'a',
            StatusCode::NoQos => 'Q',
            StatusCode::SomeQos => 'q',
            StatusCode::NoGroups => 'G',
            StatusCode::SomeGroups => 'g',
            StatusCode::RootRestricted => 'R',
            StatusCode::Inactive => 'C',
            StatusCode::Draining => 'S',
            StatusCode::Down => 'D',
            StatusCode::ReservationRequired => 'r',
        }
    }
}

/// Status codes of a partition in the order in which they were determined
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status(Vec<StatusCode>);

impl Status {
    pub fn push(&mut self, code: StatusCode) {
        self.0.push(code);
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let codes = self.0.iter().map(StatusCode::as_char).collect::<String>();
        // Padding is applied to the combined codes
        f.pad(&codes)
    }
}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Degree to which an allow or deny list admits a user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Open,
    Partial,
    Closed,
}

/// Counts how many of `memberships` are listed in the comma separated `list`
pub fn count_matches(memberships: &[String], list: &str) -> usize {
    memberships
        .iter()
        .filter(|name| split_list(list).any(|item| item == name.as_str()))
        .count()
}

/// A missing allow list admits everyone; otherwise all, some, or none of the memberships
/// must be listed
pub fn evaluate_allow(memberships: &[String], list: Option<&str>) -> Access {
    let Some(list) = list else {
        return Access::Open;
    };

    match count_matches(memberships, list) {
        0 => Access::Closed,
        matched if matched < memberships.len() => Access::Partial,
        _ => Access::Open,
    }
}

/// Mirror of [`evaluate_allow`]: denying every membership closes the partition
pub fn evaluate_deny(memberships: &[String], list: Option<&str>) -> Access {
    let Some(list) = list else {
        return Access::Open;
    };

    match count_matches(memberships, list) {
        0 => Access::Open,
        matched if matched < memberships.len() => Access::Partial,
        _ => Access::Closed,
    }
}

/// Status of a partition from the point of view of a single user
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    /// False if the user cannot submit jobs to the partition at all
    pub visible: bool,
}

impl Verdict {
    fn apply(&mut self, access: Access, partial: StatusCode, closed: StatusCode) {
        match access {
            Access::Open => {}
            Access::Partial => self.status.push(partial),
            Access::Closed => self.close(closed),
        }
    }

    fn close(&mut self, code: StatusCode) {
        self.status.push(code);
        self.visible = false;
    }
}

/// Determines the status codes of `partition` and whether `user` can use it
pub fn evaluate(partition: &PartitionRecord, user: &Memberships) -> Verdict {
    let mut verdict = Verdict {
        status: Status::default(),
        visible: true,
    };

    if partition.flags.default {
        verdict.status.push(StatusCode::Default);
    }
    if partition.flags.hidden {
        verdict.status.push(StatusCode::Hidden);
    }

    let lists = [
        (
            &user.accounts,
            &partition.allow_accounts,
            &partition.deny_accounts,
            StatusCode::SomeAccounts,
            StatusCode::NoAccounts,
        ),
        (
            &user.qos,
            &partition.allow_qos,
            &partition.deny_qos,
            StatusCode::SomeQos,
            StatusCode::NoQos,
        ),
        (
            &user.groups,
            &partition.allow_groups,
            &partition.deny_groups,
            StatusCode::SomeGroups,
            StatusCode::NoGroups,
        ),
    ];

    for (memberships, allow, deny, partial, closed) in lists {
        verdict.apply(evaluate_allow(memberships, allow.as_deref()), partial, closed);
        verdict.apply(evaluate_deny(memberships, deny.as_deref()), partial, closed);
    }

    let root = user.identity.is_root();
    if (root && partition.flags.no_root) || (!root && partition.flags.root_only) {
        verdict.close(StatusCode::RootRestricted);
    }

    match partition.state {
        PartitionState::Up => {}
        PartitionState::Inactive => verdict.status.push(StatusCode::Inactive),
        PartitionState::Drain => verdict.status.push(StatusCode::Draining),
        PartitionState::Down => verdict.status.push(StatusCode::Down),
    }

    if partition.flags.req_resv {
        verdict.status.push(StatusCode::ReservationRequired);
    }

    verdict
}
