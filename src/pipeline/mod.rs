pub mod extraction;
pub mod segment;
pub mod structuring;
pub mod processor; // Ingestion: extract → segment → generate → flatten
