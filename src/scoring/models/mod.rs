pub mod scoring_result;
