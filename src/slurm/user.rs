use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;

use super::misc::{push_unique, split_list};

/// Identity of the user requesting the report
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub name: String,
    pub uid: u32,
    pub primary_group: String,
}

impl UserIdentity {
    pub fn is_root(&self) -> bool {
        self.uid == 0 || self.name == "root"
    }
}

/// A user's identity together with the accounts, groups, and QOS they belong to
#[derive(Clone, Debug, Default)]
pub struct Memberships {
    pub identity: UserIdentity,
    pub groups: Vec<String>,
    pub accounts: Vec<String>,
    pub qos: Vec<String>,
}

/// Parses the output of `id -u -n`, `id -u`, and `id -g -n`
pub fn parse_identity(name: &[u8], uid: &[u8], group: &[u8]) -> Result<UserIdentity> {
    let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).trim().to_string();

    let uid = text(uid);
    Ok(UserIdentity {
        name: text(name),
        uid: uid
            .parse()
            .wrap_err_with(|| format!("invalid uid {:?}", uid))?,
        primary_group: text(group),
    })
}

/// Parses the whitespace separated output of `id -G -n`
pub fn parse_groups(output: &[u8]) -> Vec<String> {
    let mut groups = Vec::new();
    for group in String::from_utf8_lossy(output).split_whitespace() {
        push_unique(&mut groups, group);
    }

    groups
}

/// Parses `sacctmgr --noheader --parsable2 list association format=account,qos`,
/// returning the distinct accounts and QOS of the user
pub fn parse_associations(output: &[u8]) -> Result<(Vec<String>, Vec<String>)> {
    let mut accounts = Vec::new();
    let mut qos = Vec::new();

    for line in String::from_utf8_lossy(output).lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (account, qos_list) = line
            .split_once('|')
            .ok_or_else(|| eyre!("invalid association {:?}", line))?;

        if !account.is_empty() {
            push_unique(&mut accounts, account);
        }

        for name in split_list(qos_list) {
            push_unique(&mut qos, name);
        }
    }

    Ok((accounts, qos))
}
