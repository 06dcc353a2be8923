//! Running reconstruction of the restraint file's polymer sequence.
//!
//! Every residue reference seen while parsing is accreted into a per-tag
//! polymer record; after the file is exhausted these records are aligned
//! against the coordinate polymers.
use crate::types::ReconstructedPolymer;
use itertools::Itertools;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SequenceReconstructor {
    polymers: Vec<ReconstructedPolymer>,
    /// Positions observed with more than one concrete component id; the
    /// alternatives wait here until alignment picks the compatible one.
    ambiguous: HashMap<(String, i32), Vec<String>>,
}

impl SequenceReconstructor {
    pub fn new() -> Self {
        SequenceReconstructor::default()
    }

    /// Record one `(chain tag, seq, comp)` observation. A second
    /// observation with a different concrete comp id at the same position
    /// promotes that position to an ambiguous set; `"."` never competes.
    pub fn observe(&mut self, chain_tag: &str, seq_id: i32, comp_id: &str, orig_comp_id: Option<&str>) {
        let idx = match self
            .polymers
            .iter()
            .position(|p| p.chain_tag == chain_tag)
        {
            Some(i) => i,
            None => {
                self.polymers.push(ReconstructedPolymer::new(chain_tag));
                self.polymers.len() - 1
            }
        };
        let polymer = &mut self.polymers[idx];
        match polymer.seq_ids.iter().position(|s| *s == seq_id) {
            Some(pos) => {
                let current = polymer.comp_ids[pos].clone();
                if current == "." && comp_id != "." {
                    polymer.comp_ids[pos] = comp_id.to_string();
                    polymer.auth_comp_ids[pos] = orig_comp_id.unwrap_or(comp_id).to_string();
                } else if comp_id != "." && current != comp_id {
                    let entry = self
                        .ambiguous
                        .entry((chain_tag.to_string(), seq_id))
                        .or_insert_with(|| vec![current]);
                    if !entry.iter().any(|c| c == comp_id) {
                        entry.push(comp_id.to_string());
                    }
                }
            }
            None => {
                polymer.seq_ids.push(seq_id);
                polymer.comp_ids.push(comp_id.to_string());
                polymer
                    .auth_comp_ids
                    .push(orig_comp_id.unwrap_or(comp_id).to_string());
            }
        }
    }

    /// Remove a spurious observation (e.g. a D-peptide code that collided
    /// with a standard one). Only removes when the stored comp id matches.
    pub fn revert(&mut self, chain_tag: &str, seq_id: i32, comp_id: &str) {
        if let Some(polymer) = self.polymers.iter_mut().find(|p| p.chain_tag == chain_tag) {
            if let Some(pos) = polymer.seq_ids.iter().position(|s| *s == seq_id) {
                if polymer.comp_ids[pos] == comp_id {
                    polymer.seq_ids.remove(pos);
                    polymer.comp_ids.remove(pos);
                    polymer.auth_comp_ids.remove(pos);
                }
            }
        }
        self.ambiguous.remove(&(chain_tag.to_string(), seq_id));
    }

    /// Order every polymer by seq id.
    pub fn sort(&mut self) {
        for polymer in &mut self.polymers {
            let order: Vec<usize> = (0..polymer.seq_ids.len())
                .sorted_by_key(|&i| polymer.seq_ids[i])
                .collect();
            polymer.seq_ids = order.iter().map(|&i| polymer.seq_ids[i]).collect();
            polymer.comp_ids = order.iter().map(|&i| polymer.comp_ids[i].clone()).collect();
            polymer.auth_comp_ids = order
                .iter()
                .map(|&i| polymer.auth_comp_ids[i].clone())
                .collect();
        }
        self.polymers.sort_by(|a, b| a.chain_tag.cmp(&b.chain_tag));
    }

    /// Rewrite `"."` placeholders from a post-hoc `(tag, seq) -> comp` map.
    pub fn sync_comp_ids(&mut self, comp_id_map: &HashMap<(String, i32), String>) {
        for polymer in &mut self.polymers {
            for (pos, seq_id) in polymer.seq_ids.iter().enumerate() {
                if polymer.comp_ids[pos] == "." {
                    if let Some(comp) = comp_id_map.get(&(polymer.chain_tag.clone(), *seq_id)) {
                        polymer.comp_ids[pos] = comp.clone();
                    }
                }
            }
        }
    }

    /// Pick, for each ambiguous position, the alternative present in
    /// `resolved` (keyed like `sync_comp_ids`) and rewrite the polymer.
    pub fn resolve_ambiguities(&mut self, resolved: &HashMap<(String, i32), String>) {
        for ((tag, seq_id), alternatives) in &self.ambiguous {
            let Some(choice) = resolved.get(&(tag.clone(), *seq_id)) else {
                continue;
            };
            if !alternatives.iter().any(|a| a == choice) {
                continue;
            }
            if let Some(polymer) = self.polymers.iter_mut().find(|p| &p.chain_tag == tag) {
                if let Some(pos) = polymer.seq_ids.iter().position(|s| s == seq_id) {
                    polymer.comp_ids[pos] = choice.clone();
                }
            }
        }
    }

    pub fn polymers(&self) -> &[ReconstructedPolymer] {
        &self.polymers
    }

    pub fn ambiguous(&self) -> &HashMap<(String, i32), Vec<String>> {
        &self.ambiguous
    }

    pub fn is_empty(&self) -> bool {
        self.polymers.iter().all(|p| p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_and_sort() {
        let mut rec = SequenceReconstructor::new();
        rec.observe("A", 3, "VAL", None);
        rec.observe("A", 1, "MET", None);
        rec.observe("A", 2, "ALA", None);
        rec.observe("A", 1, "MET", None); // duplicate merges
        rec.sort();
        let polymer = &rec.polymers()[0];
        assert_eq!(polymer.seq_ids, vec![1, 2, 3]);
        assert_eq!(polymer.comp_ids, vec!["MET", "ALA", "VAL"]);
    }

    #[test]
    fn test_ambiguity_promotion() {
        let mut rec = SequenceReconstructor::new();
        rec.observe("A", 5, "LEU", None);
        rec.observe("A", 5, "ILE", None);
        let ambig = rec.ambiguous().get(&("A".to_string(), 5)).unwrap();
        assert_eq!(ambig, &vec!["LEU".to_string(), "ILE".to_string()]);

        let mut resolved = HashMap::new();
        resolved.insert(("A".to_string(), 5), "ILE".to_string());
        rec.resolve_ambiguities(&resolved);
        assert_eq!(rec.polymers()[0].comp_ids, vec!["ILE"]);
    }

    #[test]
    fn test_placeholder_refinement() {
        let mut rec = SequenceReconstructor::new();
        rec.observe("A", 1, ".", None);
        rec.observe("A", 1, "GLY", None);
        assert_eq!(rec.polymers()[0].comp_ids, vec!["GLY"]);
        assert!(rec.ambiguous().is_empty());

        rec.observe("A", 2, ".", None);
        let mut map = HashMap::new();
        map.insert(("A".to_string(), 2), "SER".to_string());
        rec.sync_comp_ids(&map);
        assert_eq!(rec.polymers()[0].comp_ids, vec!["GLY", "SER"]);
    }

    #[test]
    fn test_revert() {
        let mut rec = SequenceReconstructor::new();
        rec.observe("A", 1, "DAL", None);
        rec.revert("A", 1, "DAL");
        assert!(rec.is_empty());
    }
}
