mod capacity_tests;
mod qualification_tests;
mod relation_tests;
mod snapshot_tests;
mod unassigned_tests;
