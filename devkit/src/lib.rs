/*!
# DevWatch DevKit - Utilitaires de test

Bibliothèque partagée par les tests du kernel et de l'agent :
- Builders de payloads snapshot valides (dont le scénario `alice`)
- Client HTTP pour piloter un kernel lancé en local
*/

pub mod client;
pub mod fixtures;

pub use client::{ApiResponse, KernelClient};
pub use fixtures::SnapshotBuilder;
