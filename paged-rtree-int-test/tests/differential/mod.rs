mod rstar_oracle_test;
