//! Strategy registry and the hatching engine.

use std::collections::BTreeMap;

use pbf_slicer::{Island, Polygon};

use crate::concentric::ConcentricHatching;
use crate::error::{HatchError, Result};
use crate::grid::GridHatching;
use crate::lines::LineHatching;
use crate::strategy::{HatchLine, HatchPattern, HatchStrategy, HatchingParameters};

/// Maps pattern ids to strategy instances.
pub struct HatchRegistry {
    strategies: BTreeMap<HatchPattern, Box<dyn HatchStrategy>>,
}

impl HatchRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(HatchPattern::Lines, Box::new(LineHatching));
        registry.register(HatchPattern::Grid, Box::new(GridHatching));
        registry.register(HatchPattern::Concentric, Box::new(ConcentricHatching));
        registry
    }

    /// Register a strategy, replacing any previous one for `pattern`.
    pub fn register(&mut self, pattern: HatchPattern, strategy: Box<dyn HatchStrategy>) {
        if self.strategies.insert(pattern, strategy).is_some() {
            tracing::debug!(%pattern, "replaced hatching strategy");
        }
    }

    /// Remove a strategy, returning it if present.
    pub fn unregister(&mut self, pattern: HatchPattern) -> Option<Box<dyn HatchStrategy>> {
        self.strategies.remove(&pattern)
    }

    /// Look up a strategy.
    pub fn get(&self, pattern: HatchPattern) -> Option<&dyn HatchStrategy> {
        self.strategies.get(&pattern).map(|s| s.as_ref())
    }

    /// Registered patterns, in id order.
    pub fn patterns(&self) -> Vec<HatchPattern> {
        self.strategies.keys().copied().collect()
    }

    /// Is a strategy registered for `pattern`?
    pub fn contains(&self, pattern: HatchPattern) -> bool {
        self.strategies.contains_key(&pattern)
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for HatchRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for HatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HatchRegistry")
            .field("patterns", &self.patterns())
            .finish()
    }
}

/// Runs registered strategies.
#[derive(Debug, Default)]
pub struct HatchingEngine {
    registry: HatchRegistry,
}

impl HatchingEngine {
    /// Create an engine over `registry`.
    pub fn new(registry: HatchRegistry) -> Self {
        Self { registry }
    }

    /// The strategy registry.
    pub fn registry(&self) -> &HatchRegistry {
        &self.registry
    }

    /// Mutable access to the registry.
    pub fn registry_mut(&mut self) -> &mut HatchRegistry {
        &mut self.registry
    }

    fn strategy(&self, pattern: HatchPattern) -> Result<&dyn HatchStrategy> {
        self.registry
            .get(pattern)
            .ok_or(HatchError::UnknownPattern(pattern))
    }

    /// Hatch one island (`contours[0]` outer, rest holes).
    pub fn generate(
        &self,
        pattern: HatchPattern,
        contours: &[Polygon],
        params: &HatchingParameters,
        layer_index: usize,
    ) -> Result<Vec<HatchLine>> {
        Ok(self.strategy(pattern)?.generate(contours, params, layer_index))
    }

    /// Hatch every island of a layer, island by island.
    pub fn generate_islands(
        &self,
        pattern: HatchPattern,
        islands: &[Island],
        params: &HatchingParameters,
        layer_index: usize,
    ) -> Result<Vec<HatchLine>> {
        let strategy = self.strategy(pattern)?;
        Ok(islands
            .iter()
            .flat_map(|island| strategy.generate(&island.rings(), params, layer_index))
            .collect())
    }

    /// Reuse key of `pattern` for a layer.
    pub fn reuse_key(
        &self,
        pattern: HatchPattern,
        params: &HatchingParameters,
        layer_index: usize,
    ) -> Result<Option<u64>> {
        Ok(self.strategy(pattern)?.reuse_key(params, layer_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbf_math::Point2;

    struct Nothing;

    impl HatchStrategy for Nothing {
        fn name(&self) -> &str {
            "Nothing"
        }

        fn generate(&self, _: &[Polygon], _: &HatchingParameters, _: usize) -> Vec<HatchLine> {
            Vec::new()
        }

        fn reuse_key(&self, _: &HatchingParameters, _: usize) -> Option<u64> {
            None
        }
    }

    fn square() -> Polygon {
        Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ])
    }

    #[test]
    fn test_builtins() {
        let registry = HatchRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.patterns(), HatchPattern::ALL.to_vec());
        assert!(registry.contains(HatchPattern::Grid));
        assert_eq!(registry.get(HatchPattern::Lines).unwrap().name(), "Line Hatching");
    }

    #[test]
    fn test_register_replaces_and_unregister() {
        let mut registry = HatchRegistry::with_builtins();
        registry.register(HatchPattern::Lines, Box::new(Nothing));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(HatchPattern::Lines).unwrap().name(), "Nothing");

        assert!(registry.unregister(HatchPattern::Grid).is_some());
        assert!(registry.unregister(HatchPattern::Grid).is_none());
        assert!(!registry.contains(HatchPattern::Grid));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_engine_unknown_pattern() {
        let mut engine = HatchingEngine::default();
        engine.registry_mut().unregister(HatchPattern::Concentric);
        let result = engine.generate(
            HatchPattern::Concentric,
            &[square()],
            &HatchingParameters::default(),
            0,
        );
        assert_eq!(result, Err(HatchError::UnknownPattern(HatchPattern::Concentric)));
    }

    #[test]
    fn test_engine_islands() {
        let engine = HatchingEngine::default();
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            enable_contours: false,
            ..Default::default()
        };
        let island = Island {
            outer: square(),
            holes: Vec::new(),
        };
        let one = engine
            .generate_islands(HatchPattern::Lines, &[island.clone()], &params, 0)
            .unwrap();
        let two = engine
            .generate_islands(HatchPattern::Lines, &[island.clone(), island], &params, 0)
            .unwrap();
        assert_eq!(one.len(), 4);
        assert_eq!(two.len(), 8);

        let key0 = engine.reuse_key(HatchPattern::Lines, &params, 0).unwrap();
        let key180 = engine
            .reuse_key(
                HatchPattern::Lines,
                &HatchingParameters {
                    layer_rotation: 90.0,
                    ..params.clone()
                },
                2,
            )
            .unwrap();
        assert_eq!(key0, key180);
    }
}
