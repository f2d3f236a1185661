fn main() {
    glowtrace::run();
}
