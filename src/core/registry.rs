/*!
 * Account registry: merges per-host observations and answers drift queries.
 *
 * Accounts keep the order in which they were first observed, ids keep the
 * order in which they were first reported for an account, and hosts keep
 * merge order inside an id bucket. A host is recorded at most once per
 * bucket, so merging the same observation twice is a no-op.
 *
 * The registry is not internally synchronised; callers that merge from
 * several producers must wrap it in a lock.
 */

use std::collections::{HashMap, HashSet};

use crate::core::parser::AccountObservation;

/// Which numeric identity a query is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Uid,
    Gid,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::Uid => write!(f, "uid"),
            IdKind::Gid => write!(f, "gid"),
        }
    }
}

/// Hosts that reported one id value
#[derive(Debug, Clone)]
pub struct IdBucket {
    id: String,
    hosts: Vec<String>,
    members: HashSet<String>,
}

impl IdBucket {
    fn new(id: &str, host: &str) -> Self {
        Self {
            id: id.to_string(),
            hosts: vec![host.to_string()],
            members: HashSet::from([host.to_string()]),
        }
    }

    fn add(&mut self, host: &str) -> bool {
        if self.members.contains(host) {
            return false;
        }
        self.members.insert(host.to_string());
        self.hosts.push(host.to_string());
        true
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }
}

/// Everything known about one account name
#[derive(Debug, Clone)]
pub struct AccountEntry {
    name: String,
    uids: Vec<IdBucket>,
    gids: Vec<IdBucket>,
}

impl AccountEntry {
    fn new(observation: &AccountObservation) -> Self {
        Self {
            name: observation.account.clone(),
            uids: vec![IdBucket::new(&observation.uid, &observation.host)],
            gids: vec![IdBucket::new(&observation.gid, &observation.host)],
        }
    }

    fn record(&mut self, observation: &AccountObservation) {
        add_to_buckets(&mut self.uids, &observation.uid, &observation.host);
        add_to_buckets(&mut self.gids, &observation.gid, &observation.host);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buckets(&self, kind: IdKind) -> &[IdBucket] {
        match kind {
            IdKind::Uid => &self.uids,
            IdKind::Gid => &self.gids,
        }
    }

    /// Hosts reporting `id` for this account
    pub fn hosts_for(&self, kind: IdKind, id: &str) -> Option<&[String]> {
        self.buckets(kind)
            .iter()
            .find(|bucket| bucket.id == id)
            .map(|bucket| bucket.hosts())
    }

    /// More than one distinct id across the fleet
    pub fn is_drifting(&self, kind: IdKind) -> bool {
        self.buckets(kind).len() > 1
    }
}

fn add_to_buckets(buckets: &mut Vec<IdBucket>, id: &str, host: &str) {
    match buckets.iter_mut().find(|bucket| bucket.id == id) {
        Some(bucket) => {
            bucket.add(host);
        }
        None => buckets.push(IdBucket::new(id, host)),
    }
}

/// Insertion-ordered map from account name to [`AccountEntry`]
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    entries: Vec<AccountEntry>,
    index: HashMap<String, usize>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one observation
    pub fn merge(&mut self, observation: &AccountObservation) {
        match self.index.get(&observation.account) {
            Some(&position) => self.entries[position].record(observation),
            None => {
                self.index
                    .insert(observation.account.clone(), self.entries.len());
                self.entries.push(AccountEntry::new(observation));
            }
        }
    }

    /// Merge a batch of observations in order
    pub fn merge_all<'a, I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = &'a AccountObservation>,
    {
        for observation in observations {
            self.merge(observation);
        }
    }

    pub fn get(&self, account: &str) -> Option<&AccountEntry> {
        self.index.get(account).map(|&position| &self.entries[position])
    }

    /// All entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AccountEntry> {
        self.entries.iter()
    }

    /// Accounts with more than one distinct id of `kind`, in insertion order
    pub fn drifting_accounts(&self, kind: IdKind) -> Vec<&AccountEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.is_drifting(kind))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct hosts that contributed at least one observation
    pub fn host_count(&self) -> usize {
        let mut hosts = HashSet::new();
        for entry in &self.entries {
            for bucket in &entry.uids {
                hosts.extend(bucket.hosts.iter().map(String::as_str));
            }
        }
        hosts.len()
    }
}
