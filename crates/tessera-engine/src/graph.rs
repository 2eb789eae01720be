//! Provider dependency graph validation.
//!
//! Nodes are the enabled, instantiated providers; an edge `A → B` means "a
//! field of `A` is injected from provider `B`".  Validation reduces the graph
//! to a fixpoint in which every surviving node only depends on surviving
//! nodes with a compatible produced type, and the surviving graph is acyclic.
//!
//! Enabled providers sharing a name are removed up front.  Each iteration
//! then runs two passes:
//!
//! - **Pass A** removes nodes with a wrong dependency: missing, disabled,
//!   type-incompatible, self-referencing, or already removed.
//! - **Pass B** removes every node whose reachable subgraph contains a cycle.
//!   It is a dependency-first Kahn traversal: the nodes it never reaches are
//!   exactly the nodes that are on, or depend on, a cycle.
//!
//! Iterations repeat until one of them removes nothing.

use std::collections::HashMap;
use std::fmt;

use tessera_core::{ClassIdentity, PluginDescriptor, PluginsConfig, TypeInfo};
use tracing::{debug, error};

// =============================================================================
// ProviderTypeTable
// =============================================================================

/// Provider name → type of the values it produces.
///
/// Filled while providers are instantiated, before validation runs.
#[derive(Debug, Clone, Default)]
pub struct ProviderTypeTable {
    types: HashMap<&'static str, TypeInfo>,
}

impl ProviderTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider: &'static str, produced: TypeInfo) {
        self.types.insert(provider, produced);
    }

    pub fn get(&self, provider: &str) -> Option<TypeInfo> {
        self.types.get(provider).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// =============================================================================
// Findings
// =============================================================================

/// Why a provider was excluded from the valid set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// No instantiated provider has the requested name.
    MissingProvider { field: &'static str, provider: &'static str },
    /// The requested provider is disabled by configuration.
    DisabledProvider { field: &'static str, provider: &'static str },
    /// The requested provider produces a type the field cannot hold.
    TypeMismatch {
        field: &'static str,
        provider: &'static str,
        expected: TypeInfo,
        found: TypeInfo,
    },
    /// The provider requests a value from itself.
    SelfReference { field: &'static str },
    /// The requested provider was excluded earlier.
    InvalidDependency { field: &'static str, provider: &'static str },
    /// The provider is on a dependency cycle or depends on one.
    Cycle,
    /// Another enabled provider has the same name.
    DuplicateName,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::MissingProvider { field, provider } => {
                write!(f, "no provider found for '{provider}' (field '{field}')")
            }
            Exclusion::DisabledProvider { field, provider } => {
                write!(f, "provider '{provider}' is disabled (field '{field}')")
            }
            Exclusion::TypeMismatch {
                field,
                provider,
                expected,
                found,
            } => write!(
                f,
                "provider '{provider}' produces '{found}', not assignable to field '{field}' of type '{expected}'"
            ),
            Exclusion::SelfReference { field } => {
                write!(f, "depends on itself (field '{field}')")
            }
            Exclusion::InvalidDependency { field, provider } => {
                write!(f, "depends on invalid provider '{provider}' (field '{field}')")
            }
            Exclusion::Cycle => f.write_str("dependency cycle detected"),
            Exclusion::DuplicateName => f.write_str("another enabled provider has the same name"),
        }
    }
}

/// One excluded provider and the cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub provider: &'static str,
    pub class: ClassIdentity,
    pub cause: Exclusion,
}

/// Result of a validation run.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// Valid providers, in input order.
    pub valid: Vec<PluginDescriptor>,
    /// Every exclusion, in the order it was decided.
    pub findings: Vec<Finding>,
    /// Valid providers, dependencies first.
    pub load_order: Vec<PluginDescriptor>,
}

impl Validation {
    pub fn is_valid(&self, provider: &str) -> bool {
        self.valid.iter().any(|d| d.name() == provider)
    }

    pub fn valid_names(&self) -> Vec<&'static str> {
        self.valid.iter().map(PluginDescriptor::name).collect()
    }

    /// The finding recorded for `provider`, if it was excluded.
    pub fn finding(&self, provider: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.provider == provider)
    }
}

// =============================================================================
// GraphValidator
// =============================================================================

/// Validates provider descriptors against the configuration and the
/// produced-type table.
pub struct GraphValidator<'a> {
    config: &'a PluginsConfig,
    types: &'a ProviderTypeTable,
}

impl<'a> GraphValidator<'a> {
    pub fn new(config: &'a PluginsConfig, types: &'a ProviderTypeTable) -> Self {
        Self { config, types }
    }

    /// Returns the valid subset of `providers`.
    ///
    /// Pure: the same input always yields the same result.
    pub fn validate(&self, providers: &[PluginDescriptor]) -> Validation {
        let n = providers.len();

        let enabled: Vec<bool> = providers
            .iter()
            .map(|d| self.config.is_descriptor_enabled(d))
            .collect();

        // Enabled descriptors shadow disabled ones of the same name.
        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(n);
        let mut enabled_count: HashMap<&str, usize> = HashMap::with_capacity(n);
        for (i, desc) in providers.iter().enumerate() {
            let slot = by_name.entry(desc.name()).or_insert(i);
            if enabled[i] {
                if !enabled[*slot] {
                    *slot = i;
                }
                *enabled_count.entry(desc.name()).or_default() += 1;
            }
        }

        let mut alive = vec![false; n];
        for (i, desc) in providers.iter().enumerate() {
            if !enabled[i] {
                debug!(provider = desc.name(), "Provider disabled, skipping validation");
            } else if self.types.get(desc.name()).is_none() {
                debug!(provider = desc.name(), "Provider was not instantiated, skipping validation");
            } else {
                alive[i] = true;
            }
        }
        let is_node = alive.clone();

        let mut findings: Vec<Finding> = Vec::new();
        let mut exclude = |i: usize, cause: Exclusion, alive: &mut Vec<bool>| {
            let desc = &providers[i];
            error!(
                provider = desc.name(),
                class = %desc.class,
                cause = %cause,
                "Provider excluded from the valid set"
            );
            alive[i] = false;
            findings.push(Finding {
                provider: desc.name(),
                class: desc.class,
                cause,
            });
        };

        // No holder of a shared name is valid; dependents fail pass A.
        for i in 0..n {
            if alive[i] && enabled_count.get(providers[i].name()).copied().unwrap_or(0) > 1 {
                exclude(i, Exclusion::DuplicateName, &mut alive);
            }
        }

        let mut load_order: Vec<usize>;
        loop {
            let mut changed = false;

            // ── Pass A: wrong dependencies ─────────────────────────────────
            for i in 0..n {
                if !alive[i] {
                    continue;
                }
                let cause = providers[i].field_injections().find_map(|f| {
                    let Some(&j) = by_name.get(f.provider) else {
                        return Some(Exclusion::MissingProvider {
                            field: f.field,
                            provider: f.provider,
                        });
                    };
                    if j == i {
                        Some(Exclusion::SelfReference { field: f.field })
                    } else if !enabled[j] {
                        Some(Exclusion::DisabledProvider {
                            field: f.field,
                            provider: f.provider,
                        })
                    } else if !is_node[j] {
                        Some(Exclusion::MissingProvider {
                            field: f.field,
                            provider: f.provider,
                        })
                    } else if !alive[j] {
                        Some(Exclusion::InvalidDependency {
                            field: f.field,
                            provider: f.provider,
                        })
                    } else {
                        let found = self.types.get(f.provider)?;
                        (!found.is_assignable_to(&f.declared_type)).then(|| {
                            Exclusion::TypeMismatch {
                                field: f.field,
                                provider: f.provider,
                                expected: f.declared_type,
                                found,
                            }
                        })
                    }
                });
                if let Some(cause) = cause {
                    exclude(i, cause, &mut alive);
                    changed = true;
                }
            }

            // ── Pass B: cycles ─────────────────────────────────────────────
            let (order, stuck) = dependency_order(providers, &by_name, &alive);
            for i in stuck {
                exclude(i, Exclusion::Cycle, &mut alive);
                changed = true;
            }
            load_order = order;

            if !changed {
                break;
            }
        }

        Validation {
            valid: (0..n).filter(|&i| alive[i]).map(|i| providers[i]).collect(),
            findings,
            load_order: load_order.into_iter().map(|i| providers[i]).collect(),
        }
    }
}

/// Kahn traversal over the live nodes, dependencies first.
///
/// Returns the traversal order and the live nodes never reached.  Edges to
/// nodes that are not live are ignored; the next Pass A removes their
/// sources.
fn dependency_order(
    providers: &[PluginDescriptor],
    by_name: &HashMap<&str, usize>,
    alive: &[bool],
) -> (Vec<usize>, Vec<usize>) {
    let n = providers.len();
    let mut pending_deps: Vec<usize> = vec![0; n];
    let mut dependents: Vec<Vec<usize>> = vec![vec![]; n];

    for i in (0..n).filter(|&i| alive[i]) {
        for f in providers[i].field_injections() {
            if let Some(&j) = by_name.get(f.provider) {
                if alive[j] {
                    dependents[j].push(i);
                    pending_deps[i] += 1;
                }
            }
        }
    }

    // One frontier per layer; layers are flattened into the order.
    let mut order: Vec<usize> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| alive[i] && pending_deps[i] == 0).collect();

    while !current.is_empty() {
        let mut next: Vec<usize> = Vec::new();
        for &i in &current {
            for &j in &dependents[i] {
                pending_deps[j] -= 1;
                if pending_deps[j] == 0 {
                    next.push(j);
                }
            }
        }
        order.extend_from_slice(&current);
        next.sort_unstable();
        current = next;
    }

    let stuck = (0..n).filter(|&i| alive[i] && pending_deps[i] > 0).collect();
    (order, stuck)
}
