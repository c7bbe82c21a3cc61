pub mod simulated_annealing_acceptor;
