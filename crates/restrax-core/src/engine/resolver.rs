//! Residue and atom resolution against the coordinate model.
//!
//! A restraint reference `(chain?, seq, comp, atom)` rarely matches the
//! deposited coordinates verbatim. Resolution runs a fixed-priority chain
//! of strategies; the first one to produce a non-empty candidate set wins.
//! Rewriting strategies (external mappings, carried-in remaps) adjust the
//! query in place and let the chain continue.

use super::{DiagnosticKind, ReconcileEngine};
use crate::ccd::element_symbols;
use crate::nomenclature::{get_valid_star_atom_in_xplor, translate_std_atom_name};
use crate::types::{AtomSelection, FailedResidue, PolymerChain, ResidueCandidate};
use log::debug;

/// How far a restraint may run past a chain terminus and still be taken
/// as-is (capping groups, engineered tags).
pub const MAX_ALLOWED_EXT_SEQ: i32 = 10;

/// One in-flight residue reference, rewritten as strategies fire.
pub(crate) struct ResolveQuery {
    /// Author chain restriction, when the format carries one.
    chain_id: Option<String>,
    /// Tag used for sequence reconstruction and per-chain reasons.
    chain_tag: String,
    seq_id: i32,
    comp_id: String,
    atom_id: String,
    enable_warning: bool,
    /// Set when a candidate was accepted outside the deposited sequence.
    asis: bool,
    /// A carried-in seq remap already rewrote the query to author
    /// numbering; scheme heuristics must not reinterpret it.
    remapped: bool,
    /// The seq id existed but carried a different component.
    saw_seq_mismatch: bool,
    /// Raw inputs, kept for diagnostics and reconstructor bookkeeping.
    orig_seq_id: i32,
    orig_comp_id: String,
}

/// Default chain tag for formats that carry no chain column.
const DEFAULT_CHAIN_TAG: &str = "1";

impl<'a> ReconcileEngine<'a> {
    /// Resolve a chainless residue reference.
    pub fn assign_coord_polymer_sequence(
        &mut self,
        seq_id: i32,
        comp_id: &str,
        atom_id: &str,
    ) -> (Vec<ResidueCandidate>, bool) {
        self.resolve(ResolveQuery::new(None, DEFAULT_CHAIN_TAG, seq_id, comp_id, atom_id))
    }

    /// Resolve a residue reference restricted to one author chain.
    pub fn assign_coord_polymer_sequence_with_chain_id(
        &mut self,
        chain_id: &str,
        seq_id: i32,
        comp_id: &str,
        atom_id: &str,
    ) -> (Vec<ResidueCandidate>, bool) {
        let chain = self.effective_chain_id(chain_id);
        self.resolve(ResolveQuery::new(
            Some(&chain),
            chain_id,
            seq_id,
            comp_id,
            atom_id,
        ))
    }

    /// Resolve when the format names no component; the component is taken
    /// from whatever the coordinates hold at the resolved position.
    pub fn assign_coord_polymer_sequence_without_comp_id(
        &mut self,
        seq_id: i32,
        atom_id: &str,
    ) -> (Vec<ResidueCandidate>, bool) {
        self.resolve(ResolveQuery::new(None, DEFAULT_CHAIN_TAG, seq_id, ".", atom_id))
    }

    /// Resolve against the n-th polymer chain (1-based file ordinal), for
    /// formats that number chains instead of naming them.
    pub fn assign_coord_polymer_sequence_with_index(
        &mut self,
        chain_index: usize,
        seq_id: i32,
        comp_id: &str,
        atom_id: &str,
    ) -> (Vec<ResidueCandidate>, bool) {
        let Some(chain) = self
            .index
            .polymers()
            .get(chain_index.saturating_sub(1))
            .map(|p| p.auth_chain_id.clone())
        else {
            self.diag(
                DiagnosticKind::InvalidAtomSelection,
                format!("chain ordinal {chain_index} exceeds the coordinate model"),
            );
            return (Vec::new(), false);
        };
        self.resolve(ResolveQuery::new(
            Some(&chain),
            &chain,
            seq_id,
            comp_id,
            atom_id,
        ))
    }

    fn effective_chain_id(&self, chain_id: &str) -> String {
        if let Some(remap) = self.reasons.as_ref().and_then(|r| r.chain_id_remap.as_ref()) {
            if let Some(mapped) = remap.get(chain_id) {
                return mapped.clone();
            }
        }
        chain_id.to_string()
    }

    fn resolve(&mut self, mut query: ResolveQuery) -> (Vec<ResidueCandidate>, bool) {
        query.comp_id = self.translate_std_res_name_wrapper(&query.comp_id, None);
        self.reconstructor.observe(
            &query.chain_tag,
            query.seq_id,
            &query.comp_id,
            Some(&query.orig_comp_id),
        );
        let candidates = self
            .try_elemental_non_poly(&mut query)
            .or_else(|| self.try_split_ligand(&mut query))
            .or_else(|| self.apply_mr_atom_name_mapping(&mut query))
            .or_else(|| self.apply_reason_remaps(&mut query))
            .or_else(|| self.try_polymer_scan(&mut query))
            .or_else(|| self.try_non_poly_scan(&mut query))
            .or_else(|| self.try_label_scheme(&mut query))
            .or_else(|| self.try_alt_polymer(&mut query))
            .or_else(|| self.try_extension(&mut query))
            .or_else(|| self.record_failure(&mut query))
            .unwrap_or_default();
        debug!(
            "resolved {}:{}:{} -> {} candidate(s)",
            query.orig_seq_id,
            query.comp_id,
            query.atom_id,
            candidates.len()
        );
        // the resolved component feeds back into the reconstruction
        if let Some(first) = candidates.first() {
            if first.is_polymer && first.comp_id != query.comp_id {
                self.reconstructor
                    .revert(&query.chain_tag, query.seq_id, &query.comp_id);
                self.reconstructor.observe(
                    &query.chain_tag,
                    query.seq_id,
                    &first.comp_id,
                    Some(&query.orig_comp_id),
                );
            }
        }
        (candidates, query.asis)
    }

    // ---- strategies, in priority order ----------------------------------

    /// Bare element symbols (`ZN`, `CA` the ion) point at non-polymer
    /// entities, not at polymer residues.
    fn try_elemental_non_poly(
        &mut self,
        q: &mut ResolveQuery,
    ) -> Option<Vec<ResidueCandidate>> {
        let elem = if element_symbols().contains(q.comp_id.as_str()) {
            q.comp_id.clone()
        } else if q.comp_id == "." && element_symbols().contains(q.atom_id.as_str()) {
            q.atom_id.clone()
        } else {
            return None;
        };
        let hits: Vec<(String, i32)> = self
            .index
            .non_polys()
            .iter()
            .filter(|e| e.comp_ids.iter().any(|c| c == &elem))
            .map(|e| (e.auth_chain_id.clone(), e.auth_seq_ids[0]))
            .collect();
        let (chain_id, auth_seq_id) = match hits.len() {
            0 => return None,
            1 => hits.into_iter().next()?,
            _ => hits.into_iter().find(|(_, s)| *s == q.seq_id)?,
        };
        self.reconstructor
            .revert(&q.chain_tag, q.seq_id, &q.comp_id);
        Some(vec![ResidueCandidate {
            auth_chain_id: chain_id,
            auth_seq_id,
            comp_id: elem,
            is_polymer: false,
        }])
    }

    /// A ligand deposited as several components keeps its original single
    /// name in restraint files; route the atom to the part that holds it.
    fn try_split_ligand(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        let (chain_id, parts) = match &q.chain_id {
            Some(c) => (
                c.clone(),
                self.index.split_ligand(c, q.seq_id, &q.comp_id)?.to_vec(),
            ),
            None => {
                let (c, p) = self.index.split_ligand_any_chain(q.seq_id, &q.comp_id)?;
                (c.to_string(), p.to_vec())
            }
        };
        let atom = q.atom_id.clone();
        let part = parts
            .iter()
            .find(|p| p.atom_ids.iter().any(|a| a == &atom))
            .or_else(|| {
                parts.iter().find(|p| {
                    let exp = get_valid_star_atom_in_xplor(&self.ccd, &p.comp_id, &atom);
                    exp.atom_ids.iter().any(|a| p.atom_ids.contains(a))
                })
            })?;
        self.reconstructor
            .revert(&q.chain_tag, q.seq_id, &q.comp_id);
        Some(vec![ResidueCandidate {
            auth_chain_id: chain_id,
            auth_seq_id: part.auth_seq_id,
            comp_id: part.comp_id.clone(),
            is_polymer: false,
        }])
    }

    /// Apply the external per-file atom mapping. Rewrites only.
    fn apply_mr_atom_name_mapping(
        &mut self,
        q: &mut ResolveQuery,
    ) -> Option<Vec<ResidueCandidate>> {
        let key = (q.seq_id, q.comp_id.clone(), q.atom_id.clone());
        if let Some((seq, comp, atom)) = self.mr_atom_name_mapping.get(&key).cloned() {
            self.reconstructor
                .revert(&q.chain_tag, q.seq_id, &q.comp_id);
            q.seq_id = seq;
            q.comp_id = comp;
            q.atom_id = atom;
            self.reconstructor.observe(
                &q.chain_tag,
                q.seq_id,
                &q.comp_id,
                Some(&q.orig_comp_id),
            );
        }
        None
    }

    /// Apply remaps proposed by the previous pass. Non-polymer and
    /// branched remaps resolve outright, the rest rewrite the query.
    fn apply_reason_remaps(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        let reasons = self.reasons.as_ref()?;

        if let Some(map) = reasons.unambig_atom_id_remap.as_ref() {
            if let Some(atom) = map.get(&format!("{}:{}", q.comp_id, q.atom_id)) {
                q.atom_id = atom.clone();
            }
        }

        for map in [reasons.non_poly_remap.as_ref(), reasons.branched_remap.as_ref()] {
            if let Some(target) = map
                .and_then(|m| m.get(&q.comp_id))
                .and_then(|m| m.get(&q.seq_id))
            {
                let candidate = ResidueCandidate {
                    auth_chain_id: target.chain_id.clone(),
                    auth_seq_id: target.seq_id,
                    comp_id: target.comp_id.clone(),
                    is_polymer: false,
                };
                self.reconstructor
                    .revert(&q.chain_tag, q.seq_id, &q.comp_id);
                return Some(vec![candidate]);
            }
        }

        if let Some(ext) = reasons.ext_chain_seq_id_remap.as_ref() {
            if let Some(seq) = ext.get(&q.chain_tag).and_then(|m| m.get(&q.seq_id)) {
                q.seq_id = *seq;
                q.asis = true;
                q.remapped = true;
                return None;
            }
        }
        // positions marked file-local keep their numbering across passes
        let local = reasons
            .local_seq_scheme
            .as_ref()
            .map(|v| v.iter().any(|(c, s)| c == &q.chain_tag && *s == q.seq_id))
            .unwrap_or(false);
        if !local {
            if let Some(seq) = reasons.remapped_seq_id(Some(&q.chain_tag), q.seq_id) {
                q.seq_id = seq;
                q.remapped = true;
            }
        }
        None
    }

    /// Scan the polymer chains under the preferred numbering scheme.
    fn try_polymer_scan(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        let label_scheme = !q.remapped
            && self
                .reasons
                .as_ref()
                .and_then(|r| r.label_seq_scheme)
                .unwrap_or(false);
        let chains: Vec<PolymerChain> = self
            .index
            .polymers()
            .iter()
            .filter(|p| {
                q.chain_id
                    .as_ref()
                    .map(|c| &p.auth_chain_id == c)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        let want_comp = q.comp_id.clone();
        let want_atom = q.atom_id.clone();
        let mut candidates = Vec::new();
        for chain in &chains {
            let found = if label_scheme {
                chain.index_of_label_seq(q.seq_id).and_then(|i| {
                    let comp_ok = want_comp == "."
                        || chain.comp_ids[i] == want_comp
                        || chain.auth_comp_ids[i] == want_comp;
                    if !comp_ok {
                        q.saw_seq_mismatch = true;
                        return None;
                    }
                    chain.auth_seq_ids[i].map(|a| (a, i))
                })
            } else {
                self.get_real_chain_seq_id(chain, q.seq_id, &want_comp, q)
            };
            let Some((auth_seq, idx)) = found else {
                continue;
            };
            let comp = chain.comp_ids[idx].clone();
            if self.atom_is_plausible(&chain.auth_chain_id, auth_seq, &comp, &want_atom, q) {
                candidates.push(ResidueCandidate {
                    auth_chain_id: chain.auth_chain_id.clone(),
                    auth_seq_id: auth_seq,
                    comp_id: comp,
                    is_polymer: true,
                });
            }
        }
        if !candidates.is_empty() {
            if label_scheme {
                self.prefer_label_seq_count += 1;
            } else {
                self.prefer_auth_seq_count += 1;
            }
            return Some(candidates);
        }

        // silent probe: would the label interpretation have worked?
        if !label_scheme {
            for chain in &chains {
                if let Some(i) = chain.index_of_label_seq(q.seq_id) {
                    let comp_ok = q.comp_id == "."
                        || chain.comp_ids[i] == q.comp_id
                        || chain.auth_comp_ids[i] == q.comp_id;
                    if comp_ok && chain.auth_seq_ids[i].is_some() {
                        self.bump_label_preference();
                        break;
                    }
                }
            }
        }
        None
    }

    /// Match against non-polymer and branched entities by component and
    /// author (or alternative) numbering.
    fn try_non_poly_scan(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        let comp = self
            .index
            .translate_ligand_name(&q.comp_id)
            .unwrap_or(&q.comp_id)
            .to_string();
        let entities: Vec<_> = self
            .index
            .non_polys()
            .iter()
            .chain(self.index.branched().iter())
            .filter(|e| {
                e.comp_ids.iter().any(|c| c == &comp)
                    || e.auth_comp_ids.iter().any(|c| c == &q.comp_id)
                    || e.alt_comp_id.as_deref() == Some(q.comp_id.as_str())
            })
            .cloned()
            .collect();
        if entities.is_empty() {
            return None;
        }

        let hit = entities
            .iter()
            .find(|e| e.auth_seq_ids.contains(&q.seq_id) || e.alt_auth_seq_id == Some(q.seq_id))
            .or_else(|| (entities.len() == 1).then(|| &entities[0]))?;
        let auth_seq = if hit.auth_seq_ids.contains(&q.seq_id) {
            q.seq_id
        } else {
            hit.auth_seq_ids[0]
        };
        let resolved_comp = hit.comp_ids[0].clone();
        let target_chain = hit.auth_chain_id.clone();

        self.reconstructor
            .revert(&q.chain_tag, q.seq_id, &q.comp_id);
        if hit.is_branched {
            self.reasons_for_reparsing.add_branched_remap(
                &q.orig_comp_id,
                q.orig_seq_id,
                super::ChainSeqTarget {
                    chain_id: target_chain.clone(),
                    seq_id: auth_seq,
                    comp_id: resolved_comp.clone(),
                },
            );
        } else {
            self.reasons_for_reparsing.add_non_poly_remap(
                &q.orig_comp_id,
                q.orig_seq_id,
                super::ChainSeqTarget {
                    chain_id: target_chain.clone(),
                    seq_id: auth_seq,
                    comp_id: resolved_comp.clone(),
                },
            );
        }
        Some(vec![ResidueCandidate {
            auth_chain_id: target_chain,
            auth_seq_id: auth_seq,
            comp_id: resolved_comp,
            is_polymer: false,
        }])
    }

    /// Once the counters favor the label scheme globally, retry the scan
    /// interpreting seq ids as label numbering.
    fn try_label_scheme(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        if q.remapped || !self.label_scheme_preferred() {
            return None;
        }
        let chains: Vec<PolymerChain> = self
            .index
            .polymers()
            .iter()
            .filter(|p| {
                q.chain_id
                    .as_ref()
                    .map(|c| &p.auth_chain_id == c)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        let mut candidates = Vec::new();
        for chain in &chains {
            let Some(i) = chain.index_of_label_seq(q.seq_id) else {
                continue;
            };
            let Some(auth_seq) = chain.auth_seq_ids[i] else {
                continue;
            };
            let comp = chain.comp_ids[i].clone();
            let want_atom = q.atom_id.clone();
            let comp_ok = q.comp_id == "."
                || comp == q.comp_id
                || chain.auth_comp_ids[i] == q.comp_id;
            if comp_ok
                && self.atom_is_plausible(&chain.auth_chain_id, auth_seq, &comp, &want_atom, q)
            {
                candidates.push(ResidueCandidate {
                    auth_chain_id: chain.auth_chain_id.clone(),
                    auth_seq_id: auth_seq,
                    comp_id: comp,
                    is_polymer: true,
                });
            }
        }
        if candidates.is_empty() {
            return None;
        }
        self.bump_label_preference();
        Some(candidates)
    }

    /// The secondary polymer annotation sometimes carries the numbering a
    /// restraint file was written against.
    fn try_alt_polymer(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        let chains: Vec<PolymerChain> = self.index.alt_polymers().to_vec();
        let want_comp = q.comp_id.clone();
        let want_atom = q.atom_id.clone();
        for chain in &chains {
            let Some((auth_seq, idx)) =
                self.get_real_chain_seq_id(chain, q.seq_id, &want_comp, q)
            else {
                continue;
            };
            let comp = chain.comp_ids[idx].clone();
            if self.atom_is_plausible(&chain.auth_chain_id, auth_seq, &comp, &want_atom, q) {
                return Some(vec![ResidueCandidate {
                    auth_chain_id: chain.auth_chain_id.clone(),
                    auth_seq_id: auth_seq,
                    comp_id: comp,
                    is_polymer: true,
                }]);
            }
        }
        None
    }

    /// Accept references slightly past a chain terminus as-is; capping
    /// groups and engineered tags live there.
    fn try_extension(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        if q.comp_id == "." || !self.ccd.has_comp(&q.comp_id) {
            return None;
        }
        let t = self.ccd.type_of_comp_id(&q.comp_id);
        if !t.peptide && !t.nucleotide {
            return None;
        }
        let chains: Vec<PolymerChain> = self
            .index
            .polymers()
            .iter()
            .filter(|p| {
                q.chain_id
                    .as_ref()
                    .map(|c| &p.auth_chain_id == c)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        let chain = match chains.len() {
            1 => &chains[0],
            _ => return None,
        };
        let (min, max) = chain.auth_seq_bounds()?;
        let beyond_n = q.seq_id < min && min - q.seq_id <= MAX_ALLOWED_EXT_SEQ;
        let beyond_c = q.seq_id > max && q.seq_id - max <= MAX_ALLOWED_EXT_SEQ;
        if !beyond_n && !beyond_c {
            return None;
        }
        // caps only make sense at their own terminus
        if (q.comp_id == "ACE" && !beyond_n) || (q.comp_id == "NH2" && !beyond_c) {
            return None;
        }
        q.asis = true;
        self.reasons_for_reparsing
            .add_ext_chain_seq_id_remap(&q.chain_tag, q.seq_id, q.seq_id);
        self.reasons_for_reparsing
            .add_local_seq_scheme(&q.chain_tag, q.seq_id);
        self.poly_seq_rst_failed.push(FailedResidue {
            chain_tag: q.chain_tag.clone(),
            seq_id: q.seq_id,
            comp_id: q.comp_id.clone(),
        });
        Some(vec![ResidueCandidate {
            auth_chain_id: chain.auth_chain_id.clone(),
            auth_seq_id: q.seq_id,
            comp_id: q.comp_id.clone(),
            is_polymer: true,
        }])
    }

    /// Terminal strategy: record the failure and yield nothing.
    fn record_failure(&mut self, q: &mut ResolveQuery) -> Option<Vec<ResidueCandidate>> {
        if q.enable_warning {
            let (kind, what) = if q.saw_seq_mismatch {
                (
                    DiagnosticKind::SequenceMismatch,
                    format!(
                        "residue {} at position {} does not match the coordinates",
                        q.comp_id, q.orig_seq_id
                    ),
                )
            } else {
                (
                    DiagnosticKind::AtomNotFound,
                    format!(
                        "{}:{}:{} is not present in the coordinates",
                        q.orig_seq_id, q.comp_id, q.atom_id
                    ),
                )
            };
            self.diag(kind, what);
        }
        self.poly_seq_rst_failed.push(FailedResidue {
            chain_tag: q.chain_tag.clone(),
            seq_id: q.seq_id,
            comp_id: q.comp_id.clone(),
        });
        Some(Vec::new())
    }

    // ---- helpers ---------------------------------------------------------

    /// Locate `seq_id` in `chain` under author numbering, tolerating an
    /// insertion-code offset of one and gaps in the deposited numbering.
    fn get_real_chain_seq_id(
        &self,
        chain: &PolymerChain,
        seq_id: i32,
        comp_id: &str,
        q: &mut ResolveQuery,
    ) -> Option<(i32, usize)> {
        let comp_matches = |idx: usize| -> bool {
            if comp_id == "." {
                return true;
            }
            chain.comp_ids[idx] == comp_id
                || chain.auth_comp_ids[idx] == comp_id
                || chain
                    .alt_comp_ids
                    .as_ref()
                    .map(|alts| alts[idx] == comp_id)
                    .unwrap_or(false)
        };

        for probe in [seq_id, seq_id - 1] {
            if let Some(idx) = chain.index_of_auth_seq(probe) {
                if comp_matches(idx) {
                    return Some((probe, idx));
                }
                if probe == seq_id {
                    q.saw_seq_mismatch = true;
                }
            }
        }

        // gapped numbering: take the first deposited position at or past
        // the requested one
        if chain.gap_in_auth_seq {
            let (min, max) = chain.auth_seq_bounds()?;
            if seq_id > min && seq_id < max {
                let idx = chain
                    .auth_seq_ids
                    .iter()
                    .position(|a| a.map(|v| v >= seq_id).unwrap_or(false))?;
                if comp_matches(idx) {
                    return chain.auth_seq_ids[idx].map(|a| (a, idx));
                }
            }
        }
        None
    }

    /// Whether the atom (after nomenclature translation and wildcard
    /// expansion) can exist at the position.
    fn atom_is_plausible(
        &mut self,
        chain_id: &str,
        seq_id: i32,
        comp_id: &str,
        atom_id: &str,
        q: &mut ResolveQuery,
    ) -> bool {
        if atom_id.is_empty() || atom_id == "." {
            return true;
        }
        let expansion = get_valid_star_atom_in_xplor(&self.ccd, comp_id, atom_id);
        let atoms: Vec<String> = if expansion.atom_ids.is_empty() {
            vec![atom_id.to_string()]
        } else {
            expansion.atom_ids
        };
        atoms
            .iter()
            .any(|a| self.test_coord_atom_id_consistency(chain_id, seq_id, comp_id, a, q))
    }

    /// Check an atom against the deposited atom site, with graded
    /// downgrades for leaving hydrogens, uninstantiated hydrogens and
    /// unobserved atoms.
    fn test_coord_atom_id_consistency(
        &mut self,
        chain_id: &str,
        seq_id: i32,
        comp_id: &str,
        atom_id: &str,
        q: &mut ResolveQuery,
    ) -> bool {
        let Some(site) = self.get_coord_atom_site_of(chain_id, seq_id, Some(comp_id)) else {
            // the residue exists in the sequence record but has no
            // deposited atoms at all
            return self.index.is_unobserved_residue(chain_id, seq_id);
        };
        let name = translate_std_atom_name(atom_id, comp_id, Some(&site.atom_ids), true);
        if site.has_atom(&name) {
            return true;
        }
        let in_ccd = self
            .ccd
            .atom_ids(comp_id)
            .map(|t| t.contains(&name.as_str()))
            .unwrap_or(false);
        if in_ccd {
            if name.starts_with('H') && self.ccd.is_leaving_atom(comp_id, &name) {
                self.diag(
                    DiagnosticKind::CoordinateIssue,
                    format!("{comp_id}:{name} belongs to an ignorable hydroxyl group"),
                );
                return true;
            }
            if name.starts_with('H') {
                if q.enable_warning {
                    self.diag(
                        DiagnosticKind::HydrogenNotInstantiated,
                        format!(
                            "{chain_id}:{seq_id}:{comp_id}:{name} is not instantiated in the model"
                        ),
                    );
                }
                return true;
            }
            if self.index.is_unobserved_atom(chain_id, seq_id, &name) {
                self.diag(
                    DiagnosticKind::CoordinateIssue,
                    format!("{chain_id}:{seq_id}:{comp_id}:{name} is unobserved in the model"),
                );
                return true;
            }
            return false;
        }
        false
    }

    /// Expand and select concrete atoms for the resolved candidates,
    /// appending to the running selection set. Returns the number of
    /// selections appended.
    pub fn select_coord_atoms(
        &mut self,
        candidates: &[ResidueCandidate],
        atom_id: &str,
        allow_ambig: bool,
        asis: bool,
    ) -> usize {
        let mut appended = 0;
        for cand in candidates {
            let key = (cand.comp_id.clone(), atom_id.trim().to_uppercase());
            let atoms: Vec<String> = if let Some(mapped) = self.ambig_atom_name_mapping.get(&key)
            {
                mapped.clone()
            } else if let Some(mapped) = self
                .reasons
                .as_ref()
                .and_then(|r| r.ambig_atom_id_remap.as_ref())
                .and_then(|m| m.get(&format!("{}:{}", key.0, key.1)))
            {
                mapped.clone()
            } else {
                let expansion = get_valid_star_atom_in_xplor(&self.ccd, &cand.comp_id, atom_id);
                if expansion.atom_ids.is_empty() {
                    let name = translate_std_atom_name(atom_id, &cand.comp_id, None, true);
                    if name != key.1 {
                        self.reasons_for_reparsing
                            .add_unambig_atom_id_remap(&cand.comp_id, &key.1, &name);
                    }
                    vec![name]
                } else {
                    if expansion.atom_ids.len() > 1 {
                        self.reasons_for_reparsing.add_ambig_atom_id_remap(
                            &cand.comp_id,
                            &key.1,
                            expansion.atom_ids.clone(),
                        );
                    } else if expansion.atom_ids[0] != key.1 {
                        self.reasons_for_reparsing.add_unambig_atom_id_remap(
                            &cand.comp_id,
                            &key.1,
                            &expansion.atom_ids[0],
                        );
                    }
                    expansion.atom_ids
                }
            };

            if atoms.len() > 1 && !allow_ambig {
                self.diag(
                    DiagnosticKind::InvalidAtomSelection,
                    format!(
                        "{} on {} expands to {} atoms where a single atom is required",
                        atom_id,
                        cand.comp_id,
                        atoms.len()
                    ),
                );
                continue;
            }

            let clones: Vec<String> = self
                .reasons
                .as_ref()
                .and_then(|r| r.chain_id_clone.as_ref())
                .and_then(|m| m.get(&cand.auth_chain_id))
                .cloned()
                .unwrap_or_default();

            for atom in &atoms {
                self.atom_selection_set.push(AtomSelection {
                    chain_id: cand.auth_chain_id.clone(),
                    seq_id: cand.auth_seq_id,
                    comp_id: cand.comp_id.clone(),
                    atom_id: atom.clone(),
                    asis,
                });
                appended += 1;
                for clone in &clones {
                    self.atom_selection_set.push(AtomSelection {
                        chain_id: clone.clone(),
                        seq_id: cand.auth_seq_id,
                        comp_id: cand.comp_id.clone(),
                        atom_id: atom.clone(),
                        asis,
                    });
                    appended += 1;
                }
            }
        }
        appended
    }
}

impl ResolveQuery {
    fn new(
        chain_id: Option<&str>,
        chain_tag: &str,
        seq_id: i32,
        comp_id: &str,
        atom_id: &str,
    ) -> Self {
        ResolveQuery {
            chain_id: chain_id.map(|s| s.to_string()),
            chain_tag: chain_tag.to_string(),
            seq_id,
            comp_id: comp_id.trim().to_uppercase(),
            atom_id: atom_id.trim().to_uppercase(),
            enable_warning: true,
            asis: false,
            remapped: false,
            saw_seq_mismatch: false,
            orig_seq_id: seq_id,
            orig_comp_id: comp_id.trim().to_uppercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::CoordinateIndex;
    use crate::engine::{Reasons, MAX_PREF_LABEL_SCHEME_COUNT};
    use crate::types::PolymerType;

    fn peptide_index() -> CoordinateIndex {
        let mut b = CoordinateIndex::builder();
        let comps = ["MET", "ALA", "GLY", "LEU", "VAL"];
        for (i, comp) in comps.iter().enumerate() {
            let seq = 101 + i as i32;
            b = b
                .polymer_residue("A", PolymerType::Polypeptide, Some(seq), comp, None)
                .atom_site_names("A", seq, comp, &["N", "CA", "C", "O", "H", "HA"]);
        }
        b.build()
    }

    #[test]
    fn test_auth_scheme_direct_hit() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, asis) = engine.assign_coord_polymer_sequence(103, "GLY", "CA");
        assert!(!asis);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_seq_id, 103);
        assert!(candidates[0].is_polymer);
    }

    #[test]
    fn test_comp_mismatch_records_diagnostic() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, _) = engine.assign_coord_polymer_sequence(103, "TRP", "CA");
        assert!(candidates.is_empty());
        assert!(engine
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::SequenceMismatch));
    }

    #[test]
    fn test_label_preference_builds_up_and_flips() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        // restraints written against label numbering 1..=5
        for _ in 0..MAX_PREF_LABEL_SCHEME_COUNT {
            let (candidates, _) = engine.assign_coord_polymer_sequence(3, "GLY", "CA");
            assert!(candidates.is_empty());
        }
        // the counter has crossed the threshold, the fallback activates
        let (candidates, _) = engine.assign_coord_polymer_sequence(3, "GLY", "CA");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_seq_id, 103);
        let reasons = engine.get_reasons_for_reparsing().unwrap();
        assert_eq!(reasons.label_seq_scheme, Some(true));
    }

    #[test]
    fn test_label_scheme_reason_short_circuits() {
        let index = peptide_index();
        let mut reasons = Reasons::new();
        reasons.set_label_seq_scheme();
        let mut engine = ReconcileEngine::with_reasons(&index, Some(reasons));
        let (candidates, _) = engine.assign_coord_polymer_sequence(1, "MET", "CA");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_seq_id, 101);
    }

    #[test]
    fn test_seq_id_remap_reason_applied() {
        let index = peptide_index();
        let mut reasons = Reasons::new();
        for k in 1..=5 {
            reasons.add_seq_id_remap(k, k + 100);
        }
        let mut engine = ReconcileEngine::with_reasons(&index, Some(reasons));
        let (candidates, _) = engine.assign_coord_polymer_sequence(4, "LEU", "CA");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_seq_id, 104);
    }

    #[test]
    fn test_elemental_non_poly() {
        let index = CoordinateIndex::builder()
            .polymer_residue("A", PolymerType::Polypeptide, Some(1), "MET", None)
            .atom_site_names("A", 1, "MET", &["N", "CA"])
            .non_poly("B", 201, "ZN", None)
            .atom_site_names("B", 201, "ZN", &["ZN"])
            .build();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, _) = engine.assign_coord_polymer_sequence(500, "ZN", "ZN");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_chain_id, "B");
        assert_eq!(candidates[0].auth_seq_id, 201);
        assert!(!candidates[0].is_polymer);
    }

    #[test]
    fn test_split_ligand_routes_atom_to_part() {
        let index = CoordinateIndex::builder()
            .polymer_residue("A", PolymerType::Polypeptide, Some(1), "MET", None)
            .atom_site_names("A", 1, "MET", &["N", "CA"])
            .split_ligand(
                "B",
                301,
                "XYZ",
                vec![
                    crate::types::SplitLigandPart {
                        auth_seq_id: 301,
                        comp_id: "ABC".to_string(),
                        atom_ids: vec!["C1".to_string(), "C2".to_string()],
                    },
                    crate::types::SplitLigandPart {
                        auth_seq_id: 302,
                        comp_id: "DEF".to_string(),
                        atom_ids: vec!["N1".to_string(), "N2".to_string()],
                    },
                ],
            )
            .atom_site_names("B", 301, "ABC", &["C1", "C2"])
            .atom_site_names("B", 302, "DEF", &["N1", "N2"])
            .build();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, _) = engine.assign_coord_polymer_sequence(301, "XYZ", "N2");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].comp_id, "DEF");
        assert_eq!(candidates[0].auth_seq_id, 302);
    }

    #[test]
    fn test_terminal_extension_accepted_asis() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, asis) = engine.assign_coord_polymer_sequence(100, "ACE", "C");
        assert!(asis);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_seq_id, 100);
        let reasons = engine.get_reasons_for_reparsing().unwrap();
        assert!(reasons.ext_chain_seq_id_remap.is_some());
        assert_eq!(reasons.local_seq_scheme.as_deref(), Some(&[("1".to_string(), 100)][..]));
    }

    #[test]
    fn test_extension_accepts_in_sequence_standard_residue() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        // ALA also occurs inside the chain; just past the terminus it is
        // still taken as-is
        let (candidates, asis) = engine.assign_coord_polymer_sequence(110, "ALA", "CA");
        assert!(asis);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_seq_id, 110);
        let reasons = engine.get_reasons_for_reparsing().unwrap();
        assert!(reasons.ext_chain_seq_id_remap.is_some());
    }

    #[test]
    fn test_extension_rejects_non_standard_comp() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, asis) = engine.assign_coord_polymer_sequence(107, "HOH", "O");
        assert!(candidates.is_empty());
        assert!(!asis);
    }

    #[test]
    fn test_label_reason_checks_component() {
        let index = peptide_index();
        let mut reasons = Reasons::new();
        reasons.set_label_seq_scheme();
        let mut engine = ReconcileEngine::with_reasons(&index, Some(reasons));
        // label 3 holds GLY; a TRP reference must not silently take it
        let (candidates, _) = engine.assign_coord_polymer_sequence(3, "TRP", "CA");
        assert!(candidates.is_empty());
        assert!(engine
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::SequenceMismatch));
    }

    #[test]
    fn test_unique_atom_translation_recorded() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, asis) = engine.assign_coord_polymer_sequence(103, "GLY", "HN");
        let n = engine.select_coord_atoms(&candidates, "HN", true, asis);
        assert_eq!(n, 1);
        let selections = engine.take_atom_selection_set();
        assert_eq!(selections[0].atom_id, "H");
        let reasons = engine.get_reasons_for_reparsing().unwrap();
        let remap = reasons.unambig_atom_id_remap.as_ref().unwrap();
        assert_eq!(remap.get("GLY:HN").map(String::as_str), Some("H"));
    }

    #[test]
    fn test_extension_rejected_past_limit() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, _) =
            engine.assign_coord_polymer_sequence(105 + MAX_ALLOWED_EXT_SEQ + 20, "ALA", "CA");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_select_single_atom() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, asis) = engine.assign_coord_polymer_sequence(102, "ALA", "HA");
        let n = engine.select_coord_atoms(&candidates, "HA", true, asis);
        assert_eq!(n, 1);
        let selections = engine.take_atom_selection_set();
        assert_eq!(selections[0].atom_id, "HA");
        assert_eq!(selections[0].seq_id, 102);
    }

    #[test]
    fn test_select_methyl_pseudo_atom() {
        let index = CoordinateIndex::builder()
            .polymer_residue("A", PolymerType::Polypeptide, Some(1), "MET", None)
            .atom_site_names(
                "A",
                1,
                "MET",
                &["N", "CA", "CB", "CG", "SD", "CE", "HE1", "HE2", "HE3"],
            )
            .build();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, asis) = engine.assign_coord_polymer_sequence(1, "MET", "Q*");
        assert_eq!(candidates.len(), 1);
        let n = engine.select_coord_atoms(&candidates, "Q*", true, asis);
        assert_eq!(n, 3);
        let atoms: Vec<String> = engine
            .take_atom_selection_set()
            .into_iter()
            .map(|s| s.atom_id)
            .collect();
        assert_eq!(atoms, vec!["HE1", "HE2", "HE3"]);
    }

    #[test]
    fn test_ambiguous_selection_rejected_when_single_required() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, asis) = engine.assign_coord_polymer_sequence(101, "MET", "CA");
        let n = engine.select_coord_atoms(&candidates, "HB%", false, asis);
        assert_eq!(n, 0);
        assert!(engine
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::InvalidAtomSelection));
    }

    #[test]
    fn test_chain_id_clone_duplicates_selection() {
        let index = peptide_index();
        let mut reasons = Reasons::new();
        reasons.add_chain_id_clone("A", vec!["B".to_string()]);
        let mut engine = ReconcileEngine::with_reasons(&index, Some(reasons));
        let (candidates, asis) = engine.assign_coord_polymer_sequence(101, "MET", "CA");
        let n = engine.select_coord_atoms(&candidates, "CA", true, asis);
        assert_eq!(n, 2);
    }

    #[test]
    fn test_hydrogen_not_instantiated_still_resolves() {
        let index = CoordinateIndex::builder()
            .polymer_residue("A", PolymerType::Polypeptide, Some(1), "ALA", None)
            .atom_site_names("A", 1, "ALA", &["N", "CA", "C", "O", "CB"])
            .build();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, _) = engine.assign_coord_polymer_sequence(1, "ALA", "HA");
        assert_eq!(candidates.len(), 1);
        assert!(engine
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::HydrogenNotInstantiated));
    }

    #[test]
    fn test_chain_ordinal_resolution() {
        let index = peptide_index();
        let mut engine = ReconcileEngine::new(&index);
        let (candidates, _) =
            engine.assign_coord_polymer_sequence_with_index(1, 104, "LEU", "CA");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].auth_chain_id, "A");
    }
}
