use std::collections::HashSet;

use serenity::model::id::UserId;

/// Humans who reacted, each once, in reaction order. Reactors are given as
/// `(id, is_bot)`.
pub fn eligible(reactors: impl IntoIterator<Item = (UserId, bool)>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    reactors
        .into_iter()
        .filter(|(_, bot)| !bot)
        .map(|(id, _)| id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Picks up to `count` distinct entrants uniformly at random.
pub fn winners(entrants: &[UserId], count: usize) -> Vec<UserId> {
    let amount = count.min(entrants.len());
    rand::seq::index::sample(&mut rand::rng(), entrants.len(), amount)
        .into_iter()
        .map(|i| entrants[i])
        .collect()
}

pub fn mentions(users: &[UserId]) -> String {
    users
        .iter()
        .map(|id| format!("<@{}>", id))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, bot: bool) -> (UserId, bool) {
        (UserId::new(id), bot)
    }

    fn ids(raw: &[u64]) -> Vec<UserId> {
        raw.iter().copied().map(UserId::new).collect()
    }

    #[test]
    fn bots_and_duplicates_are_dropped() {
        let reactors = vec![user(1, false), user(2, true), user(3, false), user(1, false)];
        assert_eq!(eligible(reactors), ids(&[1, 3]));
    }

    #[test]
    fn winners_are_distinct_entrants() {
        let entrants = ids(&(1..=50).collect::<Vec<_>>());
        for _ in 0..20 {
            let picked = winners(&entrants, 5);
            assert_eq!(picked.len(), 5);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 5);
            assert!(picked.iter().all(|id| entrants.contains(id)));
        }
    }

    #[test]
    fn winner_count_is_capped_by_entrants() {
        let entrants = ids(&[4, 5]);
        let mut picked = winners(&entrants, 10);
        picked.sort();
        assert_eq!(picked, entrants);

        assert!(winners(&[], 3).is_empty());
    }

    #[test]
    fn mentions_join_with_commas() {
        assert_eq!(mentions(&ids(&[1, 2])), "<@1>, <@2>");
        assert_eq!(mentions(&[]), "");
    }
}
