mod mod_logger;
