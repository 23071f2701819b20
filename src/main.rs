use loadtester::entry;
use loadtester::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
