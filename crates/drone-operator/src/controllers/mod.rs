pub mod drone_server_controller;
