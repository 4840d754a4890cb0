//! Service catalog: resolves service names to price and duration.
//!
//! The catalog is external configuration as far as the queue engine is
//! concerned; unknown names never fail a join, they just contribute zero
//! price and a fallback duration.

use std::collections::HashMap;

use crate::config::{QueueConfig, ServiceEntry};

/// Price and duration for one service on the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDetails {
    pub price: u32,
    pub duration_minutes: u32,
}

/// Lookup table from service name to [`ServiceDetails`], plus the pricing
/// knobs that depend on it.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    entries: HashMap<String, ServiceDetails>,
    fallback_minutes: u32,
    priority_surcharge: u32,
}

/// The shop's standard menu, used when the config doesn't provide one.
/// Prices in INR, durations in minutes.
const DEFAULT_MENU: &[(&str, u32, u32)] = &[
    ("Haircut", 120, 30),
    ("Beard setting", 80, 20),
    ("Clean shave", 60, 20),
    ("Face cleanup", 250, 25),
    ("Facial", 400, 45),
    ("Treatment facial", 600, 60),
    ("Ladies haircut", 250, 40),
    ("Hair smoothing (Shoulder)", 3000, 120),
    ("Hair pumping men (Half)", 800, 45),
    ("Hair pumping men (Full)", 1500, 75),
];

impl ServiceCatalog {
    /// Build a catalog from config, falling back to the built-in menu when
    /// no services are configured.
    pub fn from_config(config: &QueueConfig) -> Self {
        let entries = if config.services.is_empty() {
            DEFAULT_MENU
                .iter()
                .map(|(name, price, minutes)| {
                    (
                        (*name).to_string(),
                        ServiceDetails {
                            price: *price,
                            duration_minutes: *minutes,
                        },
                    )
                })
                .collect()
        } else {
            config
                .services
                .iter()
                .map(|ServiceEntry { name, price, duration_minutes }| {
                    (
                        name.clone(),
                        ServiceDetails {
                            price: *price,
                            duration_minutes: *duration_minutes,
                        },
                    )
                })
                .collect()
        };

        Self {
            entries,
            fallback_minutes: config.fallback_service_minutes,
            priority_surcharge: config.priority_surcharge,
        }
    }

    /// Resolve a service name. `None` for services not on the menu.
    pub fn resolve(&self, name: &str) -> Option<&ServiceDetails> {
        self.entries.get(name)
    }

    /// Total price for a ticket: known services summed, unknown services
    /// free, plus the priority surcharge when applicable.
    pub fn price_of(&self, services: &[String], is_priority: bool) -> u32 {
        let base: u32 = services
            .iter()
            .filter_map(|s| self.resolve(s))
            .map(|d| d.price)
            .sum();
        if is_priority {
            base + self.priority_surcharge
        } else {
            base
        }
    }

    /// Total duration in minutes, with the fallback duration standing in
    /// for unknown services.
    pub fn duration_of(&self, services: &[String]) -> u32 {
        services
            .iter()
            .map(|s| {
                self.resolve(s)
                    .map(|d| d.duration_minutes)
                    .unwrap_or(self.fallback_minutes)
            })
            .sum()
    }

    pub fn fallback_minutes(&self) -> u32 {
        self.fallback_minutes
    }

    /// Number of services on the menu.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
