// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (JWT auth, tenant-checked)
// Both run inside the tenant context established by the outermost middleware.

pub mod protected;
pub mod public;
