use std::collections::HashMap;
use std::net::SocketAddr;

use distort_core::Class;
use mio::Token;
use rand::Rng;

/// Tracks the set of connected workers per class and which one is primary.
/// Election is uniform random among currently-connected workers of the
/// class (spec §4.5) — there's no notion of seniority or load, only
/// membership.
#[derive(Default)]
pub struct Roster {
    workers_by_class: HashMap<Class, Vec<Token>>,
    primary: HashMap<Class, Token>,
}

impl Roster {
    pub fn add_worker(&mut self, class: Class, token: Token) {
        self.workers_by_class.entry(class).or_default().push(token);
    }

    pub fn remove_worker(&mut self, class: Class, token: Token) {
        if let Some(list) = self.workers_by_class.get_mut(&class) {
            list.retain(|t| *t != token);
        }
        if self.primary.get(&class) == Some(&token) {
            self.primary.remove(&class);
        }
    }

    pub fn primary_for(&self, class: Class) -> Option<Token> {
        self.primary.get(&class).copied()
    }

    pub fn has_primary(&self, class: Class) -> bool {
        self.primary.contains_key(&class)
    }

    pub fn set_primary(&mut self, class: Class, token: Token) {
        self.primary.insert(class, token);
    }

    /// Pick a new primary for `class` among its remaining connected
    /// workers, if any, and record the election.
    pub fn elect(&mut self, class: Class) -> Option<Token> {
        let candidate = self.workers_by_class.get(&class).filter(|list| !list.is_empty()).map(|list| {
            let idx = rand::rng().random_range(0..list.len());
            list[idx]
        });
        if let Some(token) = candidate {
            self.primary.insert(class, token);
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_worker_has_no_automatic_primary_until_elected() {
        let mut roster = Roster::default();
        roster.add_worker(Class::Text, Token(1));
        assert!(!roster.has_primary(Class::Text));
        assert_eq!(roster.elect(Class::Text), Some(Token(1)));
        assert_eq!(roster.primary_for(Class::Text), Some(Token(1)));
    }

    #[test]
    fn removing_the_primary_clears_it() {
        let mut roster = Roster::default();
        roster.add_worker(Class::Media, Token(5));
        roster.set_primary(Class::Media, Token(5));
        roster.remove_worker(Class::Media, Token(5));
        assert!(!roster.has_primary(Class::Media));
    }

    #[test]
    fn election_with_no_workers_yields_none() {
        let mut roster = Roster::default();
        assert_eq!(roster.elect(Class::Text), None);
    }

    #[test]
    fn classes_do_not_share_worker_pools() {
        let mut roster = Roster::default();
        roster.add_worker(Class::Text, Token(1));
        roster.add_worker(Class::Media, Token(2));
        roster.remove_worker(Class::Text, Token(1));
        assert_eq!(roster.elect(Class::Text), None);
        assert_eq!(roster.elect(Class::Media), Some(Token(2)));
    }
}
