use std::collections::HashSet;
use std::hash::Hash;

/// Retorna os valores que aparecem mais de uma vez em `values`.
///
/// Cada valor repetido é reportado uma única vez, na ordem em que a
/// repetição é encontrada pela primeira vez.
pub fn find_duplicates<T>(values: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen: HashSet<&T> = HashSet::with_capacity(values.len());
    let mut reported: HashSet<&T> = HashSet::new();
    let mut duplicates = Vec::new();

    for value in values {
        if !seen.insert(value) && reported.insert(value) {
            duplicates.push(value.clone());
        }
    }

    duplicates
}
