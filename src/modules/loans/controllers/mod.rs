pub mod loan_controller;
