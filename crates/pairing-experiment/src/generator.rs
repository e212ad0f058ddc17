//! Road-map generator with controlled layout.
//!
//! Places named pins in a square area, links each pin to its nearest
//! neighbours, and guarantees the road graph is connected. The cell site
//! pin sits at the map centre so sector beams cover the whole town.

use anyhow::Result;
use mmwave_sim::geometry::Point;
use mmwave_sim::map::{Pin, RoadMap};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Name of the pin marking the base-station site.
pub const CELL_SITE_PIN: &str = "CellSite";

/// Landmark names handed out to generated pins, in order.
const PIN_NAMES: [&str; 16] = [
    "CityCenter",
    "HighStreet",
    "Station",
    "Park",
    "Riverside",
    "OldTown",
    "University",
    "Market",
    "Harbour",
    "North",
    "East",
    "South",
    "West",
    "Greenfield",
    "Millbrook",
    "Eastgate",
];

/// Configuration for road-map generation.
#[derive(Debug, Clone)]
pub struct MapGeneratorConfig {
    /// Number of route pins (excluding the cell site).
    pub pins: usize,
    /// Side length of the square map area, in metres.
    pub area_m: f64,
    /// Road links per pin towards its nearest neighbours.
    pub nearest_neighbors: usize,
}

impl Default for MapGeneratorConfig {
    fn default() -> Self {
        Self {
            pins: 13,
            area_m: 2_000.0,
            nearest_neighbors: 3,
        }
    }
}

/// Layout presets for experiments.
#[derive(Debug, Clone, Copy)]
pub enum MapPreset {
    /// Small area, few pins.
    Compact,
    /// Default town layout.
    Town,
    /// Large area with many pins.
    Sprawl,
}

impl MapPreset {
    /// Get the generator config for this preset.
    pub fn config(self) -> MapGeneratorConfig {
        match self {
            MapPreset::Compact => MapGeneratorConfig {
                pins: 8,
                area_m: 1_000.0,
                nearest_neighbors: 3,
            },
            MapPreset::Town => MapGeneratorConfig::default(),
            MapPreset::Sprawl => MapGeneratorConfig {
                pins: 16,
                area_m: 3_000.0,
                nearest_neighbors: 4,
            },
        }
    }
}

/// Generator for road maps.
pub struct MapGenerator {
    config: MapGeneratorConfig,
    rng: ChaCha8Rng,
}

impl MapGenerator {
    /// Create a new generator with the given config and seed.
    pub fn new(config: MapGeneratorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generate a connected road map.
    pub fn generate(&mut self) -> Result<RoadMap> {
        let area = self.config.area_m;
        let margin = area * 0.05;

        // Cell site at the centre, route pins scattered around it
        let mut pins = vec![Pin {
            name: CELL_SITE_PIN.to_string(),
            location: Point::new(area / 2.0, area / 2.0),
        }];
        for i in 0..self.config.pins {
            let name = PIN_NAMES
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Pin-{}", i));
            pins.push(Pin {
                name,
                location: Point::new(
                    self.rng.random_range(margin..area - margin),
                    self.rng.random_range(margin..area - margin),
                ),
            });
        }

        let edges = self.link_nearest(&pins);
        let edges = Self::connect_components(&pins, edges);
        RoadMap::new(pins, edges)
    }

    /// Link every pin to its `nearest_neighbors` closest pins.
    fn link_nearest(&self, pins: &[Pin]) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for (i, pin) in pins.iter().enumerate() {
            let mut others: Vec<(usize, f64)> = pins
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, other)| (j, pin.location.distance_to(&other.location)))
                .collect();
            others.sort_by(|a, b| a.1.total_cmp(&b.1));

            for &(j, _) in others.iter().take(self.config.nearest_neighbors) {
                let edge = (i.min(j), i.max(j));
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Bridge disconnected components with their closest cross pair.
    fn connect_components(pins: &[Pin], mut edges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
        loop {
            let components = Self::components(pins.len(), &edges);
            if components.iter().max().copied().unwrap_or(0) == 0 {
                return edges;
            }

            // Find the closest pair of pins in different components
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..pins.len() {
                for j in (i + 1)..pins.len() {
                    if components[i] == components[j] {
                        continue;
                    }
                    let d = pins[i].location.distance_to(&pins[j].location);
                    if best.map(|(_, _, bd)| d < bd).unwrap_or(true) {
                        best = Some((i, j, d));
                    }
                }
            }
            match best {
                Some((i, j, _)) => edges.push((i, j)),
                None => return edges,
            }
        }
    }

    /// Component label per pin (0-based, 0 = component of pin 0).
    fn components(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
        let mut label = (0..n).collect::<Vec<_>>();
        // Repeated relabeling; maps are small so this stays cheap
        loop {
            let mut changed = false;
            for &(a, b) in edges {
                let low = label[a].min(label[b]);
                if label[a] != low {
                    label[a] = low;
                    changed = true;
                }
                if label[b] != low {
                    label[b] = low;
                    changed = true;
                }
            }
            if !changed {
                return label;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_requested_pins() {
        let mut generator = MapGenerator::new(MapGeneratorConfig::default(), 42);
        let map = generator.generate().unwrap();
        // Route pins plus the cell site
        assert_eq!(map.pin_count(), 14);
        assert!(map.pin(CELL_SITE_PIN).is_some());
    }

    #[test]
    fn test_cell_site_sits_at_centre() {
        let config = MapGeneratorConfig::default();
        let area = config.area_m;
        let mut generator = MapGenerator::new(config, 7);
        let map = generator.generate().unwrap();
        let site = map.pin(CELL_SITE_PIN).unwrap();
        assert_eq!(site.location, Point::new(area / 2.0, area / 2.0));
    }

    #[test]
    fn test_all_pin_pairs_are_routable() {
        let mut generator = MapGenerator::new(MapGeneratorConfig::default(), 99);
        let map = generator.generate().unwrap();
        let names = map.pin_names();
        for a in &names {
            for b in &names {
                assert!(
                    map.find_path(a, b).is_some(),
                    "no path between {} and {}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_reproducible_with_seed() {
        let map1 = MapGenerator::new(MapGeneratorConfig::default(), 123).generate().unwrap();
        let map2 = MapGenerator::new(MapGeneratorConfig::default(), 123).generate().unwrap();
        assert_eq!(map1.to_json().unwrap(), map2.to_json().unwrap());
    }

    #[test]
    fn test_different_seeds_differ() {
        let map1 = MapGenerator::new(MapGeneratorConfig::default(), 1).generate().unwrap();
        let map2 = MapGenerator::new(MapGeneratorConfig::default(), 2).generate().unwrap();
        assert_ne!(map1.to_json().unwrap(), map2.to_json().unwrap());
    }

    #[test]
    fn test_presets_generate_valid_maps() {
        for preset in [MapPreset::Compact, MapPreset::Town, MapPreset::Sprawl] {
            let mut generator = MapGenerator::new(preset.config(), 5);
            let map = generator.generate().unwrap();
            assert!(map.pin_count() > 1);
            assert!(map.edge_count() >= map.pin_count() - 1);
        }
    }

    #[test]
    fn test_pins_beyond_name_pool_get_numbered() {
        let config = MapGeneratorConfig {
            pins: 20,
            area_m: 2_000.0,
            nearest_neighbors: 3,
        };
        let mut generator = MapGenerator::new(config, 11);
        let map = generator.generate().unwrap();
        assert!(map.pin("Pin-16").is_some());
    }
}
