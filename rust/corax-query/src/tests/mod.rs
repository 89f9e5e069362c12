mod multi_term_tests;
mod searcher_tests;
mod term_match_tests;
