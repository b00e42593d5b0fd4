mod others;
