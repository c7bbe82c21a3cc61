mod optimization_tests;
