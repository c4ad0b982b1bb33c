pub mod heap_verifier;
