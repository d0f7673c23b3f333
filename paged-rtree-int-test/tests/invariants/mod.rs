mod random_ops_test;
