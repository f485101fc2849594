// Identity integration tests

mod keypair_test;
